//! DOM queries and element operations for [`Page`].

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde_json::Value;
use webcast_protocol::BoundingBox;
use webcast_runtime::{Error, Result};

use super::Page;

/// Interval between selector queries in [`Page::wait_for_selector`].
const SELECTOR_POLL: Duration = Duration::from_millis(100);

/// `DOM.NodeId` of a node in the current document.
///
/// Ids go stale after navigation; query again rather than holding on to one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub i64);

const SELECT_OPTION_JS: &str = r#"(selector, values) => {
	const element = document.querySelector(selector);
	if (!element) throw new Error(`No element matches ${selector}`);
	if (element.nodeName.toLowerCase() !== 'select') throw new Error('Element is not a <select> element.');
	const selected = [];
	for (const option of element.options) {
		option.selected = values.includes(option.value);
		if (option.selected) {
			selected.push(option.value);
			if (!element.multiple) break;
		}
	}
	element.dispatchEvent(new Event('input', { bubbles: true }));
	element.dispatchEvent(new Event('change', { bubbles: true }));
	return selected;
}"#;

const SCROLL_INTO_VIEW_JS: &str = r#"(selector) => {
	const element = document.querySelector(selector);
	if (!element) return false;
	element.scrollIntoView({ behavior: 'smooth', block: 'start' });
	return true;
}"#;

const GET_ATTRIBUTE_JS: &str = r#"(selector, name) => {
	const element = document.querySelector(selector);
	if (!element) return null;
	return element.getAttribute(name) || null;
}"#;

/// Resolves upload paths against the working directory.
///
/// # Errors
///
/// Returns [`Error::InvalidArgument`] for paths that do not exist.
pub(crate) fn resolve_upload_paths(files: &[PathBuf]) -> Result<Vec<String>> {
	files
		.iter()
		.map(|file| {
			let absolute = std::path::absolute(file)?;
			if !absolute.exists() {
				return Err(Error::InvalidArgument(format!("file to upload does not exist: {}", file.display())));
			}
			Ok(absolute.to_string_lossy().into_owned())
		})
		.collect()
}

impl Page {
	async fn document_root(&self) -> Result<NodeId> {
		let result = self
			.command("DOM.getDocument", serde_json::json!({ "depth": 0 }))
			.await?;
		result
			.pointer("/root/nodeId")
			.and_then(Value::as_i64)
			.map(NodeId)
			.ok_or_else(|| Error::ProtocolError("DOM.getDocument returned no root".into()))
	}

	/// First element matching `selector`, or `None`.
	pub async fn query_selector(&self, selector: &str) -> Result<Option<NodeId>> {
		let root = self.document_root().await?;
		let result = self
			.command(
				"DOM.querySelector",
				serde_json::json!({ "nodeId": root.0, "selector": selector }),
			)
			.await?;
		Ok(result
			.get("nodeId")
			.and_then(Value::as_i64)
			.filter(|id| *id != 0)
			.map(NodeId))
	}

	/// Border box of a node, or `None` when it is not rendered.
	pub async fn bounding_box(&self, node: NodeId) -> Result<Option<BoundingBox>> {
		let result = match self
			.command("DOM.getBoxModel", serde_json::json!({ "nodeId": node.0 }))
			.await
		{
			Ok(result) => result,
			// "Could not compute box model."
			Err(e) if e.remote_code().is_some() => return Ok(None),
			Err(e) => return Err(e),
		};

		let quad: Vec<f64> = result
			.pointer("/model/border")
			.and_then(Value::as_array)
			.map(|points| points.iter().filter_map(Value::as_f64).collect())
			.unwrap_or_default();

		Ok(BoundingBox::from_quad(&quad).filter(BoundingBox::is_visible))
	}

	/// Focuses the first element matching `selector`.
	///
	/// # Errors
	///
	/// Returns [`Error::ElementNotFound`] if nothing matches.
	pub async fn focus(&self, selector: &str) -> Result<()> {
		let node = self
			.query_selector(selector)
			.await?
			.ok_or_else(|| Error::ElementNotFound(selector.to_string()))?;
		self.command("DOM.focus", serde_json::json!({ "nodeId": node.0 })).await?;
		Ok(())
	}

	/// Sets the files of an `<input type=file>`.
	pub async fn set_input_files(&self, node: NodeId, files: &[PathBuf]) -> Result<()> {
		let files = resolve_upload_paths(files)?;
		self.command(
			"DOM.setFileInputFiles",
			serde_json::json!({ "nodeId": node.0, "files": files }),
		)
		.await?;
		Ok(())
	}

	/// Convenience for a single upload path.
	pub async fn set_input_file(&self, node: NodeId, file: &Path) -> Result<()> {
		self.set_input_files(node, &[file.to_path_buf()]).await
	}

	/// Selects options of a `<select>` by value and fires `input` and `change`.
	///
	/// Returns the values that ended up selected.
	///
	/// # Errors
	///
	/// Returns [`Error::JsException`] if the element is missing or is not a `<select>`.
	pub async fn select_option(&self, selector: &str, values: &[&str]) -> Result<Vec<String>> {
		let selected = self
			.call_function(SELECT_OPTION_JS, &[Value::from(selector), serde_json::json!(values)])
			.await?;
		Ok(serde_json::from_value(selected)?)
	}

	/// Smoothly scrolls the element to the top of the viewport.
	///
	/// Returns `false` when nothing matches.
	pub async fn scroll_into_view(&self, selector: &str) -> Result<bool> {
		let scrolled = self
			.call_function(SCROLL_INTO_VIEW_JS, &[Value::from(selector)])
			.await?;
		Ok(scrolled.as_bool().unwrap_or(false))
	}

	/// Attribute value of the first match.
	///
	/// `None` covers a missing element, a missing attribute and an empty value.
	pub async fn get_attribute(&self, selector: &str, name: &str) -> Result<Option<String>> {
		let value = self
			.call_function(GET_ATTRIBUTE_JS, &[Value::from(selector), Value::from(name)])
			.await?;
		Ok(value.as_str().map(str::to_string))
	}

	/// Polls until `selector` matches an element.
	///
	/// # Errors
	///
	/// Returns [`Error::TimeoutExceeded`] if nothing appears within `timeout`.
	pub async fn wait_for_selector(&self, selector: &str, timeout: Duration) -> Result<NodeId> {
		let deadline = tokio::time::Instant::now() + timeout;
		loop {
			// the document may be swapped mid-poll
			match self.query_selector(selector).await {
				Ok(Some(node)) => return Ok(node),
				Ok(None) => {}
				Err(e) => match e.remote_code() {
					Some(code) => tracing::trace!(selector, code, error = %e, "Selector query failed"),
					None => return Err(e),
				},
			}

			let now = tokio::time::Instant::now();
			if now >= deadline {
				return Err(Error::TimeoutExceeded {
					selector: selector.to_string(),
					timeout_ms: timeout.as_millis() as u64,
				});
			}
			// the last query lands on the deadline
			tokio::time::sleep(SELECTOR_POLL.min(deadline - now)).await;
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn upload_paths_become_absolute() {
		let dir = tempfile::tempdir().unwrap();
		let file = dir.path().join("build.zip");
		std::fs::write(&file, b"PK").unwrap();

		let resolved = resolve_upload_paths(&[file.clone()]).unwrap();
		assert_eq!(resolved, vec![file.to_string_lossy().into_owned()]);
	}

	#[test]
	fn missing_upload_is_rejected() {
		let err = resolve_upload_paths(&[PathBuf::from("definitely/not/here.zip")]).unwrap_err();
		assert!(matches!(err, Error::InvalidArgument(_)));
		assert!(err.to_string().contains("not/here.zip"));
	}
}
