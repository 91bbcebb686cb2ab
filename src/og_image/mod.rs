//! Open Graph image generation
//!
//! Renders a playlist's social-share card: pick the layout variant for
//! the playlist's book count, strip emoji from the title (the HTML
//! rasterizer cannot draw them), rasterize at the configured size, and
//! store the JPEG under a path derived from the playlist id.

pub mod card;
pub mod rasterizer;

use std::io::Cursor;

use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};

use crate::domain::{DomainError, SoftDeleteScopes};
use crate::models::{card_template, playlist, playlist_book, theme, user};
use crate::services::book_service;
use crate::storage::Storage;
pub use card::{CardContext, render_card_html};
pub use rasterizer::{HtmlRasterizer, WkhtmltoimageRasterizer};

pub const OG_IMAGE_DIR: &str = "img/playlists/og_image";

/// Storage path of a playlist's card.
pub fn image_path(playlist_id: &str) -> String {
    format!("{}/{}.jpg", OG_IMAGE_DIR, playlist_id)
}

/// Pick the layout variant for an actual book count: the largest
/// supported count that does not exceed it, or the smallest supported
/// count when the playlist is below all of them.
pub fn select_book_number(supported: &[u32], count: u32) -> Option<u32> {
    supported
        .iter()
        .copied()
        .filter(|n| *n <= count)
        .max()
        .or_else(|| supported.iter().copied().min())
}

/// Drop characters the rasterizer cannot draw. Covers the emoji blocks
/// plus variation selectors and the keycap/ZWJ joiners.
pub fn remove_emoji(raw: &str) -> String {
    raw.chars().filter(|c| !is_emoji(*c)).collect()
}

fn is_emoji(c: char) -> bool {
    matches!(
        u32::from(c),
        0x200D                  // zero-width joiner
        | 0x20E3                // combining keycap
        | 0xFE0E..=0xFE0F       // variation selectors
        | 0x2600..=0x27BF       // misc symbols, dingbats
        | 0x2B00..=0x2BFF       // misc symbols and arrows (stars)
        | 0x1F000..=0x1FAFF     // emoji planes incl. regional indicators
    )
}

/// Render, rasterize and store the card for `target`, then record the
/// blob path on the playlist row. Returns the path.
pub async fn generate_for_playlist(
    db: &DatabaseConnection,
    rasterizer: &dyn HtmlRasterizer,
    storage: &Storage,
    width: u32,
    height: u32,
    target: &playlist::Model,
) -> Result<String, DomainError> {
    let theme = theme::Entity::find_by_id(target.theme_id.clone())
        .one(db)
        .await?
        .ok_or(DomainError::NotFound)?;
    let template = card_template::Entity::find_by_id(theme.template_id.clone())
        .one(db)
        .await?
        .ok_or(DomainError::NotFound)?;
    let owner = user::Entity::find_by_id(target.user_id.clone())
        .one(db)
        .await?
        .ok_or(DomainError::NotFound)?;

    let entries = playlist_book::Entity::active()
        .filter(playlist_book::Column::PlaylistId.eq(&target.id))
        .order_by_asc(playlist_book::Column::CreatedAt)
        .all(db)
        .await?;

    let supported = template.supported_counts();
    let book_number = select_book_number(&supported, entries.len() as u32).ok_or_else(|| {
        DomainError::Internal(format!(
            "Card template '{}' declares no book counts",
            template.slug
        ))
    })?;

    let isbns: Vec<String> = entries.iter().map(|e| e.book_isbn.clone()).collect();
    let views = book_service::book_views_for_isbns(db, &isbns).await?;
    let mut covers: Vec<Option<String>> = entries
        .iter()
        .take(book_number as usize)
        .map(|e| views.get(&e.book_isbn).and_then(|v| v.cover.clone()))
        .collect();
    // The layout always shows its declared count; short playlists get
    // placeholder slots.
    covers.resize(book_number as usize, None);

    // Render with a stripped copy; the stored title keeps its emoji.
    let ctx = CardContext {
        title: remove_emoji(target.title.trim()),
        theme_name: theme.tagged_name(),
        author_name: owner.display_name().to_string(),
        covers,
    };
    let html = render_card_html(&ctx, book_number, width, height);
    let raw = rasterizer.rasterize(&html, width, height).await?;
    let jpeg = normalize_jpeg(&raw, width, height)?;

    let path = image_path(&target.id);
    storage.put_bytes(&path, &jpeg).await?;

    let mut active: playlist::ActiveModel = target.clone().into();
    active.og_image = Set(Some(path.clone()));
    active.updated_at = Set(chrono::Utc::now().to_rfc3339());
    active.update(db).await?;

    tracing::info!(playlist_id = %target.id, %path, "Open Graph image generated");
    Ok(path)
}

/// Rasterizer backends do not all honor the requested size exactly;
/// decode, resize if needed, and re-encode so the stored card is always
/// `width`×`height` JPEG.
fn normalize_jpeg(raw: &[u8], width: u32, height: u32) -> Result<Vec<u8>, DomainError> {
    let decoded = image::load_from_memory(raw)
        .map_err(|e| DomainError::Internal(format!("Rasterizer output unreadable: {}", e)))?;
    let decoded = if decoded.width() != width || decoded.height() != height {
        decoded.resize_exact(width, height, image::imageops::FilterType::Triangle)
    } else {
        decoded
    };
    let mut out = Cursor::new(Vec::new());
    decoded
        .to_rgb8()
        .write_to(&mut out, image::ImageFormat::Jpeg)
        .map_err(|e| DomainError::Internal(format!("JPEG encoding failed: {}", e)))?;
    Ok(out.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selects_largest_supported_count_not_above_actual() {
        let supported = [1, 2, 4, 6];
        assert_eq!(select_book_number(&supported, 7), Some(6));
        assert_eq!(select_book_number(&supported, 6), Some(6));
        assert_eq!(select_book_number(&supported, 5), Some(4));
        assert_eq!(select_book_number(&supported, 3), Some(2));
        assert_eq!(select_book_number(&supported, 1), Some(1));
    }

    #[test]
    fn selects_minimum_when_below_all_supported_counts() {
        assert_eq!(select_book_number(&[2, 4, 6], 1), Some(2));
        assert_eq!(select_book_number(&[1, 2, 4, 6], 0), Some(1));
        assert_eq!(select_book_number(&[], 3), None);
    }

    #[test]
    fn strips_emoji_but_keeps_text() {
        assert_eq!(remove_emoji("恋愛📚の本"), "恋愛の本");
        assert_eq!(remove_emoji("読書⭐️メモ"), "読書メモ");
        assert_eq!(remove_emoji("plain title"), "plain title");
    }
}
