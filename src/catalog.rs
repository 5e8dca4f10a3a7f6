//! Indicator catalog: scrape, JSON cache, lookup
//!
//! The portal's landing page links one directory page per commodity
//! ("culture"); each directory page lists the indicator variants with their
//! series download links. The scraped catalog is cached as a JSON file and
//! reloaded from disk on later runs.

use crate::data::USER_AGENT;
use crate::error::{ForecastError, Result};
use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Commodities the portal lists but the forecaster does not cover
const EXCLUDED_ALIASES: [&str; 5] = ["algodao", "mandioca", "ovos", "suino", "tilapia"];

/// One indicator variant inside a commodity directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndicatorEntry {
    /// Series download link
    pub url: String,
    /// Display title
    pub title: String,
}

/// Commodity alias -> variant id -> entry
pub type Catalog = BTreeMap<String, BTreeMap<String, IndicatorEntry>>;

/// Resolves the indicator catalog from cache or the live portal
#[derive(Debug)]
pub struct CatalogResolver {
    base_url: String,
    cache_file: PathBuf,
    client: reqwest::blocking::Client,
}

impl CatalogResolver {
    /// Portal landing page the category links hang off
    pub const BASE_URL: &'static str = "https://www.cepea.esalq.usp.br/br";

    /// Create a resolver caching the catalog at `cache_file`
    pub fn new<P: AsRef<Path>>(cache_file: P) -> Result<Self> {
        Self::with_base_url(Self::BASE_URL, cache_file)
    }

    /// Create a resolver against a custom portal root
    pub fn with_base_url<P: AsRef<Path>>(base_url: &str, cache_file: P) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            base_url: base_url.to_string(),
            cache_file: cache_file.as_ref().to_path_buf(),
            client,
        })
    }

    /// Return the cached catalog, scraping the portal on a cache miss
    pub fn load_or_fetch(&self) -> Result<Catalog> {
        if self.cache_file.exists() {
            let text = fs::read_to_string(&self.cache_file).map_err(|e| {
                ForecastError::Persistence(format!(
                    "Reading {}: {}",
                    self.cache_file.display(),
                    e
                ))
            })?;
            return serde_json::from_str(&text).map_err(|e| {
                ForecastError::Persistence(format!(
                    "Decoding {}: {}",
                    self.cache_file.display(),
                    e
                ))
            });
        }

        self.refresh()
    }

    /// Scrape the portal and rewrite the cache file
    pub fn refresh(&self) -> Result<Catalog> {
        let catalog = self.scrape()?;

        if let Some(parent) = self.cache_file.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| {
                    ForecastError::Persistence(format!("Creating catalog dir: {}", e))
                })?;
            }
        }

        let text = serde_json::to_string_pretty(&catalog)
            .map_err(|e| ForecastError::Persistence(format!("Encoding catalog: {}", e)))?;
        fs::write(&self.cache_file, text).map_err(|e| {
            ForecastError::Persistence(format!("Writing {}: {}", self.cache_file.display(), e))
        })?;

        Ok(catalog)
    }

    fn scrape(&self) -> Result<Catalog> {
        info!("Retrieving indicator list from {}", self.base_url);

        let body = self
            .client
            .get(self.base_url.as_str())
            .send()?
            .error_for_status()?
            .text()?;

        let categories = parse_category_links(&body)?;
        let mut catalog = Catalog::new();

        for (i, category_url) in categories.iter().enumerate() {
            info!(
                "Retrieving indicator details {}/{}",
                i + 1,
                categories.len()
            );

            let alias = match category_alias(category_url) {
                Some(alias) => alias,
                None => continue,
            };
            if EXCLUDED_ALIASES.contains(&alias.as_str()) {
                continue;
            }

            let page = self
                .client
                .get(category_url.as_str())
                .send()?
                .error_for_status()?
                .text()?;
            let entries = parse_indicator_entries(&page)?;

            if !entries.is_empty() {
                catalog.insert(alias, entries);
            }
        }

        Ok(catalog)
    }
}

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| ForecastError::Fetch(format!("Selector '{}': {:?}", css, e)))
}

/// Category page links on the landing page that point at an indicator
pub fn parse_category_links(html: &str) -> Result<Vec<String>> {
    let document = Html::parse_document(html);
    let links = selector("div#imagenet-categoria div ul li a")?;

    Ok(document
        .select(&links)
        .filter_map(|a| a.value().attr("href"))
        .filter(|href| href.contains("/indicador/"))
        .map(|href| href.to_string())
        .collect())
}

/// Indicator variants listed on one commodity directory page
///
/// Each variant block carries its series link as the fourth anchor; the
/// variant id is the `?id=` suffix of that link. Blocks without a fourth
/// anchor are navigation chrome and are skipped.
pub fn parse_indicator_entries(html: &str) -> Result<BTreeMap<String, IndicatorEntry>> {
    let document = Html::parse_document(html);
    let blocks = selector("div.imagenet-content.imagenet-left div.imagenet-col-12")?;
    let anchors = selector("a")?;
    let titles = selector("div.imagenet-col-8.imagenet-sm-12.imagenet-table-titulo")?;

    let mut entries = BTreeMap::new();

    for block in document.select(&blocks) {
        let url = match block
            .select(&anchors)
            .nth(3)
            .and_then(|a| a.value().attr("href"))
        {
            Some(url) => url.to_string(),
            None => continue,
        };

        let title = match block.select(&titles).next() {
            Some(el) => el.text().collect::<String>().trim().to_string(),
            None => continue,
        };

        let id = url
            .split("?id=")
            .last()
            .unwrap_or_default()
            .to_string();

        entries.entry(id).or_insert(IndicatorEntry { url, title });
    }

    Ok(entries)
}

/// Commodity alias embedded in a category page URL
pub fn category_alias(url: &str) -> Option<String> {
    url.split("/indicador/")
        .nth(1)
        .and_then(|tail| tail.split('.').next())
        .filter(|alias| !alias.is_empty())
        .map(|alias| alias.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const LANDING_PAGE: &str = r#"
        <div id="imagenet-categoria"><div><ul>
            <li><a href="https://example.org/br/indicador/soja.aspx">Soja</a></li>
            <li><a href="https://example.org/br/indicador/milho.aspx">Milho</a></li>
            <li><a href="https://example.org/br/consultas.aspx">Consultas</a></li>
        </ul></div></div>"#;

    const CATEGORY_PAGE: &str = r#"
        <div class="imagenet-content imagenet-left">
            <div class="imagenet-col-12">
                <div class="imagenet-col-8 imagenet-sm-12 imagenet-table-titulo">
                    Indicador da Soja CEPEA/ESALQ - Paranagua
                </div>
                <a href="#">serie</a><a href="#">grafico</a><a href="#">planilha</a>
                <a href="https://example.org/br/indicador/series/soja.aspx?id=12">baixar</a>
            </div>
            <div class="imagenet-col-12">
                <a href="#">menu</a>
            </div>
        </div>"#;

    #[test]
    fn landing_page_keeps_indicator_links_only() {
        let links = parse_category_links(LANDING_PAGE).unwrap();
        assert_eq!(
            links,
            vec![
                "https://example.org/br/indicador/soja.aspx".to_string(),
                "https://example.org/br/indicador/milho.aspx".to_string(),
            ]
        );
    }

    #[test]
    fn category_page_yields_id_and_title() {
        let entries = parse_indicator_entries(CATEGORY_PAGE).unwrap();
        assert_eq!(entries.len(), 1);

        let entry = &entries["12"];
        assert_eq!(entry.title, "Indicador da Soja CEPEA/ESALQ - Paranagua");
        assert!(entry.url.ends_with("?id=12"));
    }

    #[test]
    fn alias_comes_from_the_category_url() {
        assert_eq!(
            category_alias("https://example.org/br/indicador/soja.aspx"),
            Some("soja".to_string())
        );
        assert_eq!(category_alias("https://example.org/br/consultas.aspx"), None);
    }
}
