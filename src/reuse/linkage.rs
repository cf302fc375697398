/*!
 * Translation master linkage derived from item properties.
 */

use isolang::Language;
use log::warn;
use once_cell::sync::Lazy;
use percent_encoding::percent_decode_str;
use regex::Regex;
use serde::Serialize;

use crate::app_config::ReuseConfig;
use crate::repos::PropertyMap;

/// Reuse-value code prefixed to the locale in `locale_key`
pub const REUSE_VALUE_CODE: &str = "1";

const PEG_SEPARATOR: &str = "?p=";

static LOCALE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([A-Za-z]{2,3})(-[A-Za-z0-9]{1,8})*$").unwrap()
});

/// Link between a translated item and its translation master
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReuseLinkage {
    /// Decoded master reference without its peg revision
    pub master_path: Option<String>,
    /// Peg revision of the master reference
    pub master_revision: Option<u64>,
    /// Translation locale as set on the item
    pub locale: Option<String>,
    /// Reuse-value code followed by the locale, e.g. `1nb-NO`
    pub locale_key: Option<String>,
}

impl ReuseLinkage {
    /// Repository-relative part of the master path (after `^`, if any)
    pub fn master_item_path(&self) -> Option<&str> {
        self.master_path
            .as_deref()
            .map(|p| p.split_once('^').map_or(p, |(_, path)| path))
    }
}

/// Read the translation linkage of an item, `None` if it is not a translation
pub fn link_translation(properties: &PropertyMap, config: &ReuseConfig) -> Option<ReuseLinkage> {
    let raw = properties.get(&config.master_property)?;
    // multi-valued properties hold one value per line
    let reference = raw.lines().map(str::trim).find(|l| !l.is_empty())?;

    let (encoded, master_revision) = split_peg(reference);
    let master_path = match percent_decode_str(encoded).decode_utf8() {
        Ok(decoded) => Some(decoded.into_owned()),
        Err(e) => {
            warn!("Translation master '{}' does not decode to UTF-8: {}", reference, e);
            None
        }
    };

    let locale = properties
        .get(&config.locale_property)
        .map(|l| l.trim().to_string())
        .filter(|l| !l.is_empty());

    let locale_key = match (&master_path, &locale) {
        (Some(_), Some(locale)) if is_well_formed_locale(locale) => {
            Some(format!("{}{}", REUSE_VALUE_CODE, locale))
        }
        _ => None,
    };

    Some(ReuseLinkage {
        master_path,
        master_revision,
        locale,
        locale_key,
    })
}

fn split_peg(reference: &str) -> (&str, Option<u64>) {
    match reference.rfind(PEG_SEPARATOR) {
        Some(i) => (
            &reference[..i],
            reference[i + PEG_SEPARATOR.len()..].parse().ok(),
        ),
        None => (reference, None),
    }
}

/// Whether a locale looks like `ll`, `lll` or `ll-Region...` with a known language
pub fn is_well_formed_locale(locale: &str) -> bool {
    let Some(captures) = LOCALE_REGEX.captures(locale) else {
        return false;
    };
    let language = captures[1].to_lowercase();
    match language.len() {
        2 => Language::from_639_1(&language).is_some(),
        3 => Language::from_639_3(&language).is_some(),
        _ => false,
    }
}
