//! Title cards shown at the start or end of a recording.

/// Expression that replaces the document with a centered title card.
pub fn splash_script(title: &str, subtitle: &str) -> String {
	let title = serde_json::Value::String(title.to_string());
	let subtitle = serde_json::Value::String(subtitle.to_string());
	format!(
		"(() => {{\n\
		 \tdocument.title = {title};\n\
		 \tconst root = document.documentElement;\n\
		 \troot.innerHTML = '<head></head><body></body>';\n\
		 \tconst body = document.body;\n\
		 \tbody.style.cssText = 'margin:0;height:100vh;display:flex;flex-direction:column;align-items:center;justify-content:center;background:#111;color:#f5f5f5;font-family:system-ui,-apple-system,Segoe UI,sans-serif;';\n\
		 \tconst h1 = document.createElement('h1');\n\
		 \th1.textContent = {title};\n\
		 \th1.style.cssText = 'margin:0;font-size:64px;font-weight:700;';\n\
		 \tbody.append(h1);\n\
		 \tif ({subtitle}) {{\n\
		 \t\tconst p = document.createElement('p');\n\
		 \t\tp.textContent = {subtitle};\n\
		 \t\tp.style.cssText = 'margin:16px 0 0;font-size:28px;opacity:0.7;';\n\
		 \t\tbody.append(p);\n\
		 \t}}\n\
		 \treturn true;\n\
		 }})()"
	)
}
