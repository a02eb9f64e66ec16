use crate::gallery::GalleryEntry;
use crate::metadata::ERROR_KEY;
use maud::{html, Markup, PreEscaped, DOCTYPE};

const STYLE: &str = r#"
body { font-family: sans-serif; margin: 2rem; background: #f4f4f4; }
form { background: #fff; padding: 1rem; margin-bottom: 2rem; display: grid; grid-template-columns: max-content 1fr; gap: .5rem 1rem; max-width: 40rem; }
form button { grid-column: 2; justify-self: start; }
.grid { display: grid; grid-template-columns: repeat(auto-fill, minmax(260px, 1fr)); gap: 1rem; }
.card { background: #fff; padding: .5rem; }
.card img { width: 100%; height: 180px; object-fit: cover; }
.card dl { display: grid; grid-template-columns: max-content 1fr; gap: .2rem .5rem; font-size: .85rem; }
.card dt { font-weight: bold; }
.error { color: #b00020; }
"#;

// Prefills the form from /get_exif_gps when a file is selected.
const PREFILL_SCRIPT: &str = r#"
const select = document.getElementById('filename');
async function prefill() {
  if (!select.value) return;
  const response = await fetch('/get_exif_gps/' + encodeURIComponent(select.value));
  if (!response.ok) return;
  const data = await response.json();
  for (const key of ['latitude', 'longitude', 'artist', 'copyright']) {
    document.getElementById(key).value = data[key] ?? '';
  }
}
select.addEventListener('change', prefill);
prefill();
"#;

pub fn gallery_page(entries: &[GalleryEntry]) -> Markup {
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="utf-8";
                title { "EXIF editor" }
                style { (PreEscaped(STYLE)) }
            }
            body {
                h1 { "EXIF editor" }
                @if entries.is_empty() {
                    p { "No images found." }
                } @else {
                    (edit_form(entries))
                }
                div class="grid" {
                    @for entry in entries {
                        (image_card(entry))
                    }
                }
                @if !entries.is_empty() {
                    script { (PreEscaped(PREFILL_SCRIPT)) }
                }
            }
        }
    }
}

fn edit_form(entries: &[GalleryEntry]) -> Markup {
    html! {
        form method="post" action="/modify_exif" {
            label for="filename" { "Image" }
            select name="filename" id="filename" {
                @for entry in entries {
                    option value=(entry.filename) { (entry.filename) }
                }
            }
            label for="latitude" { "Latitude" }
            input type="text" name="latitude" id="latitude" placeholder="e.g. 40.7128";
            label for="longitude" { "Longitude" }
            input type="text" name="longitude" id="longitude" placeholder="e.g. -74.0060";
            label for="artist" { "Artist" }
            input type="text" name="artist" id="artist";
            label for="copyright" { "Copyright" }
            input type="text" name="copyright" id="copyright";
            button type="submit" { "Save EXIF" }
        }
    }
}

fn image_card(entry: &GalleryEntry) -> Markup {
    html! {
        div class="card" {
            img src={ "/fulls/" (entry.filename) } alt=(entry.filename) loading="lazy";
            h3 { (entry.filename) }
            @if let Some(error) = entry.exif.get(ERROR_KEY) {
                p class="error" { (error) }
            } @else if entry.exif.is_empty() {
                p { "No EXIF data." }
            } @else {
                dl {
                    @for (name, value) in &entry.exif {
                        dt { (name) }
                        dd { (value) }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::FlatTags;

    #[test]
    fn empty_gallery_renders() {
        let page = gallery_page(&[]).into_string();
        assert!(page.contains("No images found."));
        assert!(!page.contains("<form"));
    }

    #[test]
    fn cards_escape_values() {
        let mut exif = FlatTags::new();
        exif.insert("Artist".into(), "<b>me</b>".into());
        let entries = vec![
            GalleryEntry { filename: "a.jpg".into(), exif },
            GalleryEntry {
                filename: "b.jpg".into(),
                exif: [(ERROR_KEY.to_string(), "Could not read EXIF: bad".to_string())]
                    .into_iter()
                    .collect(),
            },
        ];
        let page = gallery_page(&entries).into_string();
        assert!(page.contains("&lt;b&gt;me&lt;/b&gt;"));
        assert!(page.contains(r#"src="/fulls/a.jpg""#));
        assert!(page.contains(r#"<option value="b.jpg">"#));
        assert!(page.contains("Could not read EXIF: bad"));
    }
}
