//! Help output colors.

use clap::builder::Styles;
use clap::builder::styling::{AnsiColor, Effects};

/// Recording-light palette: red section headings, bright white flags and
/// yellow value placeholders.
pub fn cli_styles() -> Styles {
	let heading = AnsiColor::Red.on_default().effects(Effects::BOLD);
	Styles::styled()
		.header(heading)
		.usage(heading)
		.literal(AnsiColor::BrightWhite.on_default().bold())
		.placeholder(AnsiColor::Yellow.on_default())
		.valid(AnsiColor::Green.on_default())
		.invalid(AnsiColor::Yellow.on_default().bold())
		.error(AnsiColor::BrightRed.on_default().bold())
}
