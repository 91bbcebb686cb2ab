//! Card HTML layouts
//!
//! One fixed-size social card per supported book count. The markup is
//! deliberately self-contained (inline CSS, no scripts) because the
//! rasterizer loads nothing beyond what it is handed.

/// Everything a card shows. `covers` is already trimmed to the layout's
/// book count; missing covers render as a neutral placeholder.
pub struct CardContext {
    pub title: String,
    pub theme_name: String,
    pub author_name: String,
    pub covers: Vec<Option<String>>,
}

pub fn render_card_html(ctx: &CardContext, book_number: u32, width: u32, height: u32) -> String {
    let columns = match book_number {
        1 => 1,
        2 => 2,
        4 => 2,
        _ => 3,
    };
    let covers: String = ctx
        .covers
        .iter()
        .take(book_number as usize)
        .map(|cover| match cover {
            Some(url) => format!(
                r#"<div class="cover"><img src="{}" alt=""></div>"#,
                escape(url)
            ),
            None => r#"<div class="cover placeholder"></div>"#.to_string(),
        })
        .collect();

    format!(
        r#"<!DOCTYPE html>
<html>
<head>
<meta charset="UTF-8">
<style>
  body {{
    margin: 0;
    width: {width}px;
    height: {height}px;
    font-family: 'Hiragino Kaku Gothic ProN', 'Noto Sans CJK JP', sans-serif;
    background: #fdf6ec;
    display: flex;
  }}
  .covers {{
    width: 55%;
    display: grid;
    grid-template-columns: repeat({columns}, 1fr);
    align-content: center;
    justify-items: center;
    gap: 12px;
    padding: 24px;
    box-sizing: border-box;
  }}
  .cover {{ box-shadow: 0 2px 8px rgba(0,0,0,.25); }}
  .cover img {{ max-height: {cover_height}px; }}
  .cover.placeholder {{ width: 120px; height: {cover_height}px; background: #d8cfc0; }}
  .meta {{
    width: 45%;
    display: flex;
    flex-direction: column;
    justify-content: center;
    padding: 32px;
    box-sizing: border-box;
  }}
  .theme {{ color: #a5673f; font-size: 28px; }}
  .title {{ color: #333; font-size: 48px; font-weight: bold; margin: 16px 0; }}
  .author {{ color: #777; font-size: 24px; }}
</style>
</head>
<body>
  <div class="covers">{covers}</div>
  <div class="meta">
    <div class="theme">{theme}</div>
    <div class="title">{title}</div>
    <div class="author">{author}</div>
  </div>
</body>
</html>"#,
        width = width,
        height = height,
        columns = columns,
        cover_height = if book_number <= 2 { height - 120 } else { (height - 140) / 2 },
        covers = covers,
        theme = escape(&ctx.theme_name),
        title = escape(&ctx.title),
        author = escape(&ctx.author_name),
    )
}

fn escape(raw: &str) -> String {
    raw.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
