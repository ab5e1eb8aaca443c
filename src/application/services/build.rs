//! Build service
//!
//! Loads descriptor and page files, runs the tree builder against a
//! document and renders the result.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use itertools::Itertools;
use serde_json::Value;
use tracing::{debug, instrument};

use crate::application::{ApplicationError, ApplicationResult, IoResultExt};
use crate::config::{OutputFormat, Settings};
use crate::domain::{Attach, Created, Document, NodeId, NodeTree, TreeBuilder, TreeNodeConvert};
use crate::infrastructure::traits::FileSystem;

/// Input of one build.
#[derive(Debug, Clone, Default)]
pub struct BuildRequest {
    /// JSON descriptor file
    pub descriptor: PathBuf,
    /// HTML page to build into; an empty skeleton when absent
    pub page: Option<PathBuf>,
    /// Selector of the attach target, defaults to `body`
    pub into: Option<String>,
    /// `append` or `insert-before`
    pub mode: Option<String>,
    /// Selector of the reference sibling for `insert-before`
    pub before: Option<String>,
}

impl BuildRequest {
    pub fn new(descriptor: impl Into<PathBuf>) -> Self {
        Self {
            descriptor: descriptor.into(),
            ..Default::default()
        }
    }

    /// Whether the produced nodes go into the page at all.
    pub fn attaches(&self) -> bool {
        self.into.is_some() || self.mode.is_some() || self.before.is_some()
    }
}

/// Result of one build.
#[derive(Debug)]
pub struct BuildOutput {
    pub document: Document,
    pub created: Created<NodeId>,
    /// Parent the nodes were attached to, `None` for a detached build
    pub attached: Option<NodeId>,
}

/// Service for building descriptors into documents.
pub struct BuildService {
    fs: Arc<dyn FileSystem>,
    settings: Arc<Settings>,
}

impl BuildService {
    /// Create a new build service.
    pub fn new(fs: Arc<dyn FileSystem>, settings: Arc<Settings>) -> Self {
        Self { fs, settings }
    }

    fn builder(&self) -> TreeBuilder {
        TreeBuilder::with_markers(self.settings.markers.clone())
    }

    /// Read and parse a JSON descriptor file.
    #[instrument(level = "debug", skip(self))]
    pub fn load_descriptor(&self, path: &Path) -> ApplicationResult<Value> {
        let content = self
            .fs
            .read_to_string(path)
            .with_path_context("read descriptor", path)?;
        serde_json::from_str(&content).map_err(|source| ApplicationError::InvalidDescriptor {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Read an HTML page into a document, or an empty skeleton without a page.
    #[instrument(level = "debug", skip(self))]
    pub fn load_page(&self, path: Option<&Path>) -> ApplicationResult<Document> {
        match path {
            Some(path) => {
                let markup = self
                    .fs
                    .read_to_string(path)
                    .with_path_context("read page", path)?;
                Ok(Document::from_page(&markup))
            }
            None => Ok(Document::new()),
        }
    }

    #[instrument(level = "debug", skip(self))]
    pub fn build(&self, request: &BuildRequest) -> ApplicationResult<BuildOutput> {
        let descriptor = self.load_descriptor(&request.descriptor)?;
        let mut document = self.load_page(request.page.as_deref())?;

        let attach = if request.attaches() {
            Some(self.resolve_attach(&document, request)?)
        } else {
            None
        };
        let attached = attach.as_ref().map(Attach::parent);

        let created = self
            .builder()
            .create(&mut document, Some(&descriptor), attach)?;
        debug!("build: created {} node(s), attached={:?}", created.len(), attached);

        Ok(BuildOutput {
            document,
            created,
            attached,
        })
    }

    /// Resolve the `into`/`before` selectors against the page.
    ///
    /// With only `before` given, the parent is the reference's parent.
    fn resolve_attach(
        &self,
        document: &Document,
        request: &BuildRequest,
    ) -> ApplicationResult<Attach<NodeId>> {
        let root = document.root();
        let find = |selector: &str, scope: NodeId| -> ApplicationResult<NodeId> {
            document
                .query(scope, selector)?
                .ok_or_else(|| ApplicationError::NoMatch(selector.to_string()))
        };

        let parent = match &request.into {
            Some(selector) => Some(find(selector, root)?),
            None => None,
        };
        let reference = match &request.before {
            Some(selector) => Some(find(selector, parent.unwrap_or(root))?),
            None => None,
        };
        let parent = parent
            .or_else(|| reference.and_then(|r| document.parent(r)))
            .unwrap_or_else(|| document.body());

        let mode = match (&request.mode, reference) {
            (Some(mode), _) => mode.as_str(),
            (None, Some(_)) => "insert-before",
            (None, None) => "append",
        };
        Ok(Attach::from_mode(mode, parent, reference)?)
    }

    /// Attached builds render the page body, detached builds each created node.
    pub fn render(&self, output: &BuildOutput, format: OutputFormat) -> String {
        let document = &output.document;
        let nodes = match output.attached {
            Some(_) => vec![document.body()],
            None => output.created.iter().copied().collect(),
        };
        match format {
            OutputFormat::Html => nodes.iter().map(|&node| document.outer_html(node)).join("\n"),
            OutputFormat::Tree => nodes
                .iter()
                .map(|&node| document.to_tree_string(node).to_string())
                .join(""),
        }
    }

    /// Outer HTML of the first (or every) element matching `selector` in a page.
    #[instrument(level = "debug", skip(self))]
    pub fn query(&self, page: &Path, selector: &str, all: bool) -> ApplicationResult<Vec<String>> {
        let document = self.load_page(Some(page))?;
        let root = document.root();
        let matches = if all {
            document.query_all(root, selector)?
        } else {
            document.query(root, selector)?.into_iter().collect()
        };
        Ok(matches.into_iter().map(|id| document.outer_html(id)).collect())
    }
}
