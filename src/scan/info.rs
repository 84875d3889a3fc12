use anyhow::Result;
use async_trait::async_trait;

use super::{ScanKind, ScanOutcome, ScanProgress, ScanProvider};

#[derive(Debug, Clone, PartialEq)]
pub struct InfoLink {
    pub label: String,
    pub url: String,
}

pub const DEFAULT_LINKS: [(&str, &str); 4] = [
    ("BBC Politics", "https://www.bbc.co.uk/news/politics"),
    ("Guardian Politics", "https://www.theguardian.com/politics"),
    ("GOV.UK announcements", "https://www.gov.uk/search/news-and-communications"),
    ("Hansard", "https://hansard.parliament.uk/"),
];

/// The disabled variant: no network, just when the data was last updated and
/// where to look for news.
pub struct InfoScan {
    last_updated: String,
    links: Vec<InfoLink>,
}

impl InfoScan {
    pub fn new(last_updated: &str) -> Self {
        Self {
            last_updated: last_updated.to_string(),
            links: DEFAULT_LINKS
                .iter()
                .map(|(label, url)| InfoLink {
                    label: label.to_string(),
                    url: url.to_string(),
                })
                .collect(),
        }
    }

    pub fn outcome(&self) -> ScanOutcome {
        ScanOutcome::Info {
            last_updated: self.last_updated.clone(),
            links: self.links.clone(),
        }
    }
}

#[async_trait]
impl ScanProvider for InfoScan {
    fn kind(&self) -> ScanKind {
        ScanKind::Disabled
    }

    async fn scan(&self, _progress: &mut (dyn ScanProgress + Send)) -> Result<ScanOutcome> {
        Ok(self.outcome())
    }
}
