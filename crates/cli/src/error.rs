use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
	#[error("cannot read config {path}")]
	ConfigRead {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("invalid config {path}: {source}")]
	ConfigParse {
		path: PathBuf,
		#[source]
		source: serde_json::Error,
	},

	#[error("build archive not found: {0}")]
	MissingArchive(PathBuf),

	#[error("{0}")]
	Scenario(String),

	#[error(transparent)]
	Session(#[from] webcast::Error),
}

impl CliError {
	/// Browser-side failures that usually mean the target app changed.
	pub fn is_page_mismatch(&self) -> bool {
		matches!(
			self,
			CliError::Session(webcast::Error::ElementNotFound(_) | webcast::Error::ElementNotVisible(_) | webcast::Error::TimeoutExceeded { .. })
		)
	}
}
