//! Device and media emulation for [`Page`].

use webcast_protocol::{MediaFeature, Viewport};
use webcast_runtime::Result;

use super::Page;

impl Page {
	/// Overrides the layout viewport and device scale factor.
	pub async fn set_viewport(&self, viewport: &Viewport) -> Result<()> {
		self.command(
			"Emulation.setDeviceMetricsOverride",
			serde_json::json!({
				"width": viewport.width,
				"height": viewport.height,
				"deviceScaleFactor": viewport.device_scale_factor,
				"mobile": false,
			}),
		)
		.await?;
		tracing::debug!(width = viewport.width, height = viewport.height, scale = viewport.device_scale_factor, "Viewport set");
		Ok(())
	}

	/// Emulates CSS media features such as `prefers-color-scheme`.
	///
	/// An empty slice clears earlier overrides.
	pub async fn emulate_media_features(&self, features: &[MediaFeature]) -> Result<()> {
		self.command(
			"Emulation.setEmulatedMedia",
			serde_json::json!({ "features": features }),
		)
		.await?;
		Ok(())
	}
}
