//! The fixed content-document template

use crate::assets::{FONTS_STYLESHEET, LAYOUT_STYLESHEET};
use crate::layout::{self, TEXT_DIR};
use quick_xml::escape::escape;

/// Wrap a rewritten body in the canonical XHTML document
pub fn render_document(title: &str, language: &str, body: &str) -> String {
    let fonts = layout::relative_href(TEXT_DIR, FONTS_STYLESHEET);
    let style = layout::relative_href(TEXT_DIR, LAYOUT_STYLESHEET);
    format!(
        r#"<?xml version="1.0" encoding="utf-8"?>
<!DOCTYPE html PUBLIC "-//W3C//DTD XHTML 1.1//EN"
  "http://www.w3.org/TR/xhtml11/DTD/xhtml11.dtd">

<html xmlns="http://www.w3.org/1999/xhtml" xmlns:epub="http://www.idpf.org/2007/ops" xml:lang="{language}">
<head>
  <title>{title}</title>
  <meta http-equiv="Content-Type" content="text/html; charset=utf-8"/>
  <link href="{fonts}" type="text/css" rel="stylesheet"/>
  <link href="{style}" type="text/css" rel="stylesheet"/>
  <style type="text/css" class="kobostylehacks">div#book-inner {{ margin-top: 0; margin-bottom: 0;}}</style>
</head>

<body>
  <div id="book-columns">
    <div id="book-inner">
{body}
    </div>
  </div>
</body>
</html>
"#,
        language = escape(language),
        title = escape(title),
        fonts = fonts,
        style = style,
        body = body.trim(),
    )
}
