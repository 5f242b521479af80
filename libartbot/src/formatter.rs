//! Caption and alt text for a catalog record

use crate::error::{ArtbotError, Result};
use crate::types::{CatalogRecord, PostContent};

const HASHTAGS: &str = "#magicthegathering #mtg";

fn required<'a>(record: &'a CatalogRecord, field: &str, value: Option<&'a str>) -> Result<&'a str> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(ArtbotError::InvalidInput(format!(
            "Catalog record {} is missing required field '{}'",
            record, field
        ))),
    }
}

/// Build the post caption and image alt text for `record`
///
/// # Errors
///
/// Returns `ArtbotError::InvalidInput` if `name`, `set_name`, `artist` or
/// `flavor_text` is missing or blank.
pub fn format_post(record: &CatalogRecord) -> Result<PostContent> {
    let name = required(record, "name", Some(record.name.as_str()))?;
    let set_name = required(record, "set_name", Some(record.set_name.as_str()))?;
    let artist = required(record, "artist", record.artist.as_deref())?;
    let flavor_text = required(record, "flavor_text", record.flavor_text.as_deref())?;

    let text = format!(
        "{} ({})\nArtist: {}\n\n{}\n\n{}",
        name, set_name, artist, flavor_text, HASHTAGS
    );
    let alt_text = format!(
        "Art for the Magic: the Gathering card '{}' from the set '{}' by the artist '{}'",
        name, set_name, artist
    );

    Ok(PostContent { text, alt_text })
}

/// Whether `record` can be posted: it formats, has art, and its caption fits
pub fn is_postable(record: &CatalogRecord, max_post_length: usize) -> bool {
    if record.art_url().is_none() {
        return false;
    }

    match format_post(record) {
        Ok(content) => content.text_len() <= max_post_length,
        Err(_) => false,
    }
}

/// Keep only the records that [`is_postable`] accepts, preserving order
pub fn postable_records(catalog: Vec<CatalogRecord>, max_post_length: usize) -> Vec<CatalogRecord> {
    catalog
        .into_iter()
        .filter(|record| is_postable(record, max_post_length))
        .collect()
}
