//! The recorded walkthrough of the d1 control panel.

use std::time::Duration;

use webcast::WebCast;

use crate::config::{Credentials, ScenarioConfig};
use crate::error::{CliError, Result};

const SUBMIT: &str = "button[type=submit]";
const NEW_ITEM: &str = "main button";
const SUCCESS_ICON: &str = "main ul>li svg.text-success";
const INSTANCE_ROW: &str = "main ul>li>div";
const INSTANCE_PREFIX: &str = "instance-";

/// How long a build may take before its success icon shows.
const BUILD_TIMEOUT: Duration = Duration::from_millis(120_000);

/// Pause at the end so the final state is visible in the video.
const OUTRO: Duration = Duration::from_millis(2000);

fn progress(message: &str) {
	tracing::info!(target: "webcast::scenario", "{}", message);
}

/// Strips the row id prefix, `instance-42` to `42`.
pub fn instance_id_from(row_id: Option<&str>) -> Option<String> {
	row_id
		.and_then(|id| id.get(INSTANCE_PREFIX.len()..))
		.filter(|id| !id.is_empty())
		.map(str::to_string)
}

/// Signs in when the page shows a password field. Returns whether it did.
///
/// `pause` is held before typing and again before submitting.
pub async fn login_if_needed(cast: &mut WebCast, credentials: &Credentials, pause: Duration) -> Result<bool> {
	if !cast.element_exists("#password").await? {
		return Ok(false);
	}

	progress(&format!("log in as {}", credentials.login));
	tokio::time::sleep(pause).await;
	cast.text_type("#name", &credentials.login).await?;
	cast.text_type("#password", &credentials.password).await?;
	tokio::time::sleep(pause).await;
	cast.element_click("form button[type=submit]").await?;
	Ok(true)
}

/// Runs the whole walkthrough, closing the session on every path.
pub async fn run(config: &ScenarioConfig) -> Result<()> {
	if !config.archive.is_file() {
		return Err(CliError::MissingArchive(config.archive.clone()));
	}

	let mut cast = WebCast::new(config.webcast_options());
	let result = steps(&mut cast, config).await;
	let closed = cast.close().await;

	match (result, closed) {
		(Err(e), Err(close_err)) => {
			tracing::warn!(error = %close_err, "Close after failure also failed");
			Err(e)
		}
		(Err(e), Ok(())) => Err(e),
		(Ok(()), closed) => closed.map_err(CliError::from),
	}
}

struct Steps<'a> {
	cast: &'a mut WebCast,
	look_around: Duration,
}

impl Steps<'_> {
	/// Logs the step and gives the viewer a moment before it happens.
	async fn next(&self, message: &str) {
		progress(message);
		tokio::time::sleep(self.look_around).await;
	}

	/// Brings the submit button into view and presses it.
	async fn submit(&mut self, message: &str) -> Result<()> {
		self.next(message).await;
		self.cast.element_scroll_into_view(SUBMIT).await?;
		tokio::time::sleep(self.look_around).await;
		self.cast.element_click(SUBMIT).await?;
		Ok(())
	}
}

async fn steps(cast: &mut WebCast, config: &ScenarioConfig) -> Result<()> {
	progress("start");
	cast.start().await?;
	cast.goto(&config.url).await?;
	cast.screencast(&config.output).await?;

	let mut s = Steps {
		cast,
		look_around: Duration::from_millis(config.look_around_delay_ms),
	};

	login_if_needed(s.cast, &config.credentials, s.look_around).await?;

	create_app(&mut s).await?;
	upload_build(&mut s, config).await?;
	let instance_id = create_instance(&mut s).await?;
	attach_domain(&mut s, &instance_id).await?;

	tokio::time::sleep(OUTRO).await;
	s.cast.stop().await?;
	Ok(())
}

async fn create_app(s: &mut Steps<'_>) -> Result<()> {
	s.next("navigate to new app").await;
	s.cast.element_click(NEW_ITEM).await?;

	s.next("create new app").await;
	s.cast.text_type("#app_id", "demo").await?;

	s.next("select preset").await;
	s.cast.element_select("#preset", "nuxt").await?;

	s.submit("submit new app").await
}

async fn upload_build(s: &mut Steps<'_>, config: &ScenarioConfig) -> Result<()> {
	s.next("navigate to builds").await;
	s.cast.element_click("nav > :nth-child(5)").await?;

	s.next("navigate to new build").await;
	s.cast.element_click(NEW_ITEM).await?;

	s.next("build name").await;
	s.cast.text_type("#build_name", "first build").await?;

	s.next("build select archive").await;
	s.cast.element_file_select("input[type=file]", &config.archive).await?;

	s.submit("submit new build").await?;

	s.cast.element_wait_for(SUCCESS_ICON, Some(BUILD_TIMEOUT)).await?;
	tokio::time::sleep(s.look_around).await;
	Ok(())
}

async fn create_instance(s: &mut Steps<'_>) -> Result<String> {
	s.next("navigate to instances").await;
	s.cast.element_click("nav > :nth-child(4)").await?;

	s.next("navigate to new instance").await;
	s.cast.element_click(NEW_ITEM).await?;

	s.next("instance name").await;
	s.cast.text_type("#instance_name", "main").await?;

	s.next("instance port").await;
	s.cast.text_type("#port", "3000").await?;

	s.submit("submit new instance").await?;

	s.cast.element_wait_for(SUCCESS_ICON, None).await?;
	tokio::time::sleep(s.look_around).await;

	let row_id = s.cast.element_get_attribute(INSTANCE_ROW, "id").await?;
	let instance_id =
		instance_id_from(row_id.as_deref()).ok_or_else(|| CliError::Scenario("instance id not found".to_string()))?;
	progress(&format!("instance id: {instance_id}"));
	Ok(instance_id)
}

async fn attach_domain(s: &mut Steps<'_>, instance_id: &str) -> Result<()> {
	s.next("navigate to domains").await;
	s.cast.element_click("nav > :nth-child(3)").await?;

	s.next("navigate to new domain").await;
	s.cast.element_click(NEW_ITEM).await?;

	s.next("domain name").await;
	s.cast.text_type("#domain_name", "demo.citrus.run").await?;

	s.next("select instance").await;
	s.cast.element_select("#domain_instance", instance_id).await?;

	s.next("select access method").await;
	s.cast.element_select("#access", "cloudflare").await?;
	// the access method triggers an API request
	s.cast.wait().await?;

	s.submit("submit new domain").await
}
