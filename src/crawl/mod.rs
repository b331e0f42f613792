//! Traversal of the remote site.
//!
//! Starting from one or more classified roots, the [`Crawler`] walks the site
//! depth-first with an explicit work stack. Each stack entry carries the index
//! of the folder its videos belong to, so folder membership never lives in a
//! free variable. Pages are read through a [`PageProvider`]; nothing here
//! knows about HTTP or browsers.
//!
//! | Kind | Visit |
//! |------|-------|
//! | `Video` | register the id, add it to the current folder |
//! | `Account` | fan out to `<account>/videos`, `/channels`, `/albums` |
//! | `VideoListing`, `Category` | read every page of the listing |
//! | `Folder` | read the title, create the directory, read every page |
//! | `System`, `Unrecognized` | read the links of the single page |

mod items;

pub use items::{DiscoveredItem, DiscoveredItems, Folder};

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tracing::{debug, info, instrument, warn};

use crate::config::RunConfig;
use crate::locator::{Classifier, ResourceIdentifier, ResourceKind};
use crate::mirror::{clean_title, folder_dir_name, write_marker};
use crate::page::{By, FindOptions, PageProvider};
use crate::report::{Operation, RunReport};
use crate::site::{CONTENT_LINKS, FOLDER_TITLE_SOURCES, NEXT_PAGE, TitleSource};

/// Traversal options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlSettings {
    /// Mirror directory; folder directories are created inside it.
    pub target_dir: PathBuf,
    pub create_folders: bool,
    /// Cap on the children taken from one listing.
    pub max_items: Option<usize>,
    /// Attempts per page load.
    pub retry_count: u32,
    /// Wait for the first folder title location.
    pub page_timeout: Duration,
}

impl CrawlSettings {
    /// Extracts the traversal options of a run.
    #[must_use]
    pub fn from_config(config: &RunConfig) -> Self {
        Self {
            target_dir: config.target_dir.clone(),
            create_folders: config.create_folders,
            max_items: config.max_items,
            retry_count: config.retry_count.max(1),
            page_timeout: config.page_timeout,
        }
    }
}

/// Everything a traversal found.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlOutput {
    pub items: DiscoveredItems,
    pub folders: Vec<Folder>,
}

/// One pending visit.
#[derive(Debug)]
struct Visit {
    target: ResourceIdentifier,
    /// Index into [`CrawlOutput::folders`] of the enclosing folder.
    folder: Option<usize>,
}

/// Depth-first site traversal.
pub struct Crawler<'a> {
    page: &'a dyn PageProvider,
    classifier: &'a Classifier,
    settings: CrawlSettings,
    interrupted: Option<Arc<AtomicBool>>,
}

impl<'a> Crawler<'a> {
    /// Creates a crawler reading pages through `page`.
    #[must_use]
    pub fn new(page: &'a dyn PageProvider, classifier: &'a Classifier, settings: CrawlSettings) -> Self {
        Self {
            page,
            classifier,
            settings,
            interrupted: None,
        }
    }

    /// Stops the traversal early once `flag` is set.
    #[must_use]
    pub fn with_interrupt(mut self, flag: Arc<AtomicBool>) -> Self {
        self.interrupted = Some(flag);
        self
    }

    fn is_interrupted(&self) -> bool {
        self.interrupted
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::SeqCst))
    }

    /// Traverses everything reachable from `roots`.
    ///
    /// Page failures are recorded in `report` and skip the affected subtree;
    /// the traversal itself never fails.
    #[instrument(skip_all, fields(roots = roots.len()))]
    pub async fn crawl(&self, roots: &[ResourceIdentifier], report: &mut RunReport) -> CrawlOutput {
        let mut output = CrawlOutput::default();
        let mut visited: HashSet<String> = HashSet::new();
        let mut stack: Vec<Visit> = roots
            .iter()
            .rev()
            .map(|target| Visit {
                target: target.clone(),
                folder: None,
            })
            .collect();

        while let Some(visit) = stack.pop() {
            if self.is_interrupted() {
                warn!(pending = stack.len() + 1, "traversal interrupted");
                break;
            }

            let target = &visit.target;
            if let Some(video_id) = target.video_id() {
                match visit.folder {
                    Some(index) => {
                        let folder = &mut output.folders[index];
                        folder.add_member(video_id);
                        output.items.add_membership(video_id, &folder.dir_name);
                    }
                    None => {
                        output.items.insert(video_id);
                    }
                }
                continue;
            }
            if !visited.insert(target.canonical().to_string()) {
                debug!(url = %target, "already visited");
                continue;
            }

            let mut context = visit.folder;
            let children = match target.kind() {
                ResourceKind::Account => {
                    info!(account = target.account().unwrap_or_default(), "processing account");
                    [
                        target.account_videos(),
                        target.account_category("channels"),
                        target.account_category("albums"),
                    ]
                    .into_iter()
                    .flatten()
                    .collect()
                }
                ResourceKind::VideoListing | ResourceKind::Category => {
                    if self.load_page(&target.fetch_url(), report).await {
                        self.collect_listing(report).await
                    } else {
                        Vec::new()
                    }
                }
                ResourceKind::Folder => {
                    let (children, folder) = self.visit_folder(target, report, &mut output).await;
                    context = folder.or(context);
                    children
                }
                ResourceKind::System | ResourceKind::Unrecognized | ResourceKind::Video => {
                    if self.load_page(&target.fetch_url(), report).await {
                        self.collect_page(report).await
                    } else {
                        Vec::new()
                    }
                }
            };

            stack.extend(children.into_iter().rev().map(|child| Visit {
                target: child,
                folder: context,
            }));
        }

        if !output.folders.is_empty() {
            info!(folders = output.folders.len(), "got folders");
        }
        info!(videos = output.items.len(), "traversal complete");
        output
    }

    /// Loads `url`, retrying up to the configured count.
    async fn load_page(&self, url: &str, report: &mut RunReport) -> bool {
        let attempts = self.settings.retry_count.max(1);
        let mut last_error = String::new();
        for attempt in 1..=attempts {
            match self.page.navigate(url).await {
                Ok(()) => return true,
                Err(error) => {
                    warn!(url, attempt, %error, "page load failed");
                    last_error = error.to_string();
                }
            }
        }
        report.error(
            Operation::Crawl,
            url,
            format!("page load failed after {attempts} attempts: {last_error}"),
        );
        false
    }

    /// Visits a folder; returns its children and, when materialized, its index.
    async fn visit_folder(
        &self,
        target: &ResourceIdentifier,
        report: &mut RunReport,
        output: &mut CrawlOutput,
    ) -> (Vec<ResourceIdentifier>, Option<usize>) {
        let url = target.fetch_url();
        let attempts = self.settings.retry_count.max(1);
        let mut loaded = false;
        let mut title = None;
        for attempt in 1..=attempts {
            if let Err(error) = self.page.navigate(&url).await {
                warn!(url, attempt, %error, "folder page load failed");
                continue;
            }
            loaded = true;
            title = self.read_folder_title().await;
            if title.is_some() {
                break;
            }
            warn!(url, attempt, "folder title not found");
        }

        if !loaded {
            report.error(
                Operation::Crawl,
                &url,
                format!("page load failed after {attempts} attempts"),
            );
            return (Vec::new(), None);
        }

        let mut folder_index = None;
        match title {
            None => report.error(
                Operation::Folder,
                target.canonical(),
                format!("folder title not found after {attempts} attempts, visiting as a plain page"),
            ),
            Some(title) => {
                info!(folder = %title, "processing folder");
                if self.settings.create_folders {
                    match self.materialize_folder(target, &title).await {
                        Ok(folder) => {
                            output.folders.push(folder);
                            folder_index = Some(output.folders.len() - 1);
                        }
                        Err(error) => report.error(
                            Operation::Folder,
                            target.canonical(),
                            format!("could not create folder directory: {error}"),
                        ),
                    }
                }
            }
        }
        (self.collect_listing(report).await, folder_index)
    }

    /// First non-empty title among the known title locations.
    async fn read_folder_title(&self) -> Option<String> {
        for (position, source) in FOLDER_TITLE_SOURCES.iter().enumerate() {
            let options = if position == 0 {
                FindOptions::waiting(self.settings.page_timeout)
            } else {
                FindOptions::immediate()
            };
            let element = match self.page.find_one(&source.by(), options).await {
                Ok(Some(element)) => element,
                Ok(None) => continue,
                Err(error) => {
                    debug!(%error, "title lookup failed");
                    continue;
                }
            };
            let raw = match source {
                TitleSource::Text(_) => element.text().await.ok(),
                TitleSource::Attribute(_, name) => element.attribute(name).await.ok().flatten(),
            };
            if let Some(title) = raw.map(|raw| clean_title(&raw)).filter(|t| !t.is_empty()) {
                return Some(title);
            }
        }
        None
    }

    async fn materialize_folder(
        &self,
        source: &ResourceIdentifier,
        title: &str,
    ) -> std::io::Result<Folder> {
        let dir_name = folder_dir_name(title);
        let path = self.settings.target_dir.join(&dir_name);
        tokio::fs::create_dir_all(&path).await?;
        write_marker(&path, source).await?;
        debug!(path = %path.display(), "folder directory ready");
        Ok(Folder {
            dir_name,
            path,
            source: source.clone(),
            title: title.to_string(),
            members: Vec::new(),
        })
    }

    /// Collects the children of a paginated listing, starting at the current page.
    async fn collect_listing(&self, report: &mut RunReport) -> Vec<ResourceIdentifier> {
        let mut children = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();
        loop {
            let before = children.len();
            for child in self.collect_page(report).await {
                if seen.insert(child.canonical().to_string()) {
                    children.push(child);
                }
            }
            if let Some(max) = self.settings.max_items
                && children.len() >= max
            {
                children.truncate(max);
                break;
            }
            if children.len() == before {
                debug!("page added nothing new, stopping pagination");
                break;
            }

            match self.page.find_one(&By::css(NEXT_PAGE), FindOptions::immediate()).await {
                Ok(Some(next)) => {
                    if let Err(error) = next.click().await {
                        report.error(Operation::Crawl, self.current_url().await, error.to_string());
                        break;
                    }
                }
                Ok(None) => break,
                Err(error) => {
                    report.error(Operation::Crawl, self.current_url().await, error.to_string());
                    break;
                }
            }
        }
        children
    }

    /// Classifies the content links of the current page.
    async fn collect_page(&self, report: &mut RunReport) -> Vec<ResourceIdentifier> {
        let current = self.current_url().await;
        info!(url = %current, "processing page");

        let elements = match self.page.find_all(&By::css(CONTENT_LINKS)).await {
            Ok(elements) => elements,
            Err(error) => {
                report.error(Operation::Crawl, current, error.to_string());
                return Vec::new();
            }
        };

        let mut items = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();
        for element in elements {
            let href = match element.attribute("href").await {
                Ok(Some(href)) => href,
                Ok(None) => continue,
                Err(error) => {
                    debug!(%error, "unreadable link");
                    continue;
                }
            };
            if href.ends_with("settings") {
                continue;
            }
            match self.classifier.classify(&href) {
                Ok(child) => {
                    if seen.insert(child.canonical().to_string()) {
                        items.push(child);
                    }
                }
                Err(error) => debug!(%href, %error, "skipping link"),
            }
        }
        if let Some(max) = self.settings.max_items {
            items.truncate(max);
        }

        let videos = items.iter().filter(|i| i.kind() == ResourceKind::Video).count();
        info!(videos, others = items.len() - videos, "got items");
        items
    }

    async fn current_url(&self) -> String {
        self.page.current_url().await.unwrap_or_default()
    }
}
