//! Scripted in-memory stand-in for the KDA search page.
//!
//! `FakeSite` keeps a tiny node tree shaped like the real grid and overlay.
//! Rendering a page (search submit or pager postback) rebuilds the tree and
//! bumps a generation counter, so every element captured before the rebuild
//! reports stale exactly like a WebDriver reference after a postback.

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;

use kdafs_core::{AppConfig, InspectionRecord};
use kdafs_scraper::{locators, BrowserError, BrowserSurface, RecordSink, Selector, SinkError};

pub const HEADERS: [&str; 6] = [
    "Facility",
    "Inspection Date",
    "Inspection Type",
    "Establishment Type",
    "Current Inspection Report",
    "Map",
];

const TABLE_ID: &str = "MainContent_gvInspections";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FakeElement {
    node: usize,
    generation: u64,
}

#[derive(Debug, Clone, Default)]
pub struct FakeViolation {
    pub code: String,
    pub explanation: Option<String>,
    pub comments: Option<String>,
}

impl FakeViolation {
    pub fn new(code: &str) -> Self {
        Self {
            code: code.to_owned(),
            ..Self::default()
        }
    }

    pub fn explained(mut self, text: &str) -> Self {
        self.explanation = Some(text.to_owned());
        self
    }

    pub fn commented(mut self, text: &str) -> Self {
        self.comments = Some(text.to_owned());
        self
    }
}

#[derive(Debug, Clone)]
pub struct FakeOverlay {
    pub appears: bool,
    pub closable: bool,
    pub header_date: Option<String>,
    pub facility: Option<String>,
    pub violations: Vec<FakeViolation>,
}

impl FakeOverlay {
    pub fn with(violations: Vec<FakeViolation>) -> Self {
        Self {
            appears: true,
            closable: true,
            header_date: Some("1/2/2025".to_owned()),
            facility: Some("Food service establishment".to_owned()),
            violations,
        }
    }

    pub fn never_appears() -> Self {
        Self {
            appears: false,
            ..Self::with(Vec::new())
        }
    }

    pub fn without_close(mut self) -> Self {
        self.closable = false;
        self
    }
}

#[derive(Debug, Clone)]
pub struct FakeRow {
    pub facility: String,
    pub date: String,
    pub kind: String,
    pub establishment: String,
    pub overlay: Option<FakeOverlay>,
    pub cell_count: usize,
}

impl FakeRow {
    pub fn plain(name: &str) -> Self {
        Self {
            facility: format!("{name}\n1 Main St\nTopeka, KS 66603"),
            date: "1/2/2025".to_owned(),
            kind: "Routine".to_owned(),
            establishment: "Food Service".to_owned(),
            overlay: None,
            cell_count: HEADERS.len(),
        }
    }

    pub fn with_overlay(mut self, overlay: FakeOverlay) -> Self {
        self.overlay = Some(overlay);
        self
    }

    pub fn with_cells(mut self, cell_count: usize) -> Self {
        self.cell_count = cell_count;
        self
    }
}

#[derive(Debug, Clone)]
pub struct PagerLink {
    pub text: String,
    pub target: u32,
    pub stale: bool,
}

impl PagerLink {
    pub fn new(text: &str, target: u32) -> Self {
        Self {
            text: text.to_owned(),
            target,
            stale: false,
        }
    }

    pub fn stale(mut self) -> Self {
        self.stale = true;
        self
    }
}

pub fn postback_href(target: u32) -> String {
    format!("javascript:__doPostBack('ctl00$MainContent$gvInspections','Page${target}')")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    None,
    Search,
    OpenOverlay { page: u32, row: usize },
    Toggle(usize),
    Close,
    GoTo(u32),
}

#[derive(Debug, Clone)]
struct Node {
    tag: &'static str,
    dom_id: Option<String>,
    text: String,
    href: Option<String>,
    children: Vec<usize>,
    action: Action,
    reveal_on: Option<usize>,
    stale_text: bool,
    in_overlay: bool,
    detached: bool,
}

impl Node {
    fn new(tag: &'static str) -> Self {
        Self {
            tag,
            dom_id: None,
            text: String::new(),
            href: None,
            children: Vec::new(),
            action: Action::None,
            reveal_on: None,
            stale_text: false,
            in_overlay: false,
            detached: false,
        }
    }

    fn id(mut self, selector: &Selector) -> Self {
        let Selector::Id(id) = selector else {
            panic!("expected id selector, got {selector}");
        };
        self.dom_id = Some(id.clone());
        self
    }

    fn raw_id(mut self, id: &str) -> Self {
        self.dom_id = Some(id.to_owned());
        self
    }

    fn text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    fn action(mut self, action: Action) -> Self {
        self.action = action;
        self
    }

    fn overlay(mut self) -> Self {
        self.in_overlay = true;
        self
    }
}

#[derive(Default)]
struct SiteState {
    pages: Vec<Vec<FakeRow>>,
    pager_overrides: HashMap<u32, Vec<PagerLink>>,
    nodes: Vec<Node>,
    roots: Vec<usize>,
    table: Option<usize>,
    generation: u64,
    current_page: Option<u32>,
    expanded: HashSet<usize>,
    stale_lookups: HashMap<Selector, u32>,
    stale_row_reads: u32,
    lookups: HashMap<Selector, u32>,
    frozen_pagination: bool,
    overlay_opens: u32,
}

impl SiteState {
    fn reset(&mut self) {
        self.generation += 1;
        self.nodes.clear();
        self.roots.clear();
        self.table = None;
        self.expanded.clear();
        self.current_page = None;
    }

    fn add_root(&mut self, node: Node) -> usize {
        self.nodes.push(node);
        let idx = self.nodes.len() - 1;
        self.roots.push(idx);
        idx
    }

    fn add_child(&mut self, parent: usize, node: Node) -> usize {
        let in_overlay = self.nodes[parent].in_overlay;
        let mut node = node;
        node.in_overlay |= in_overlay;
        self.nodes.push(node);
        let idx = self.nodes.len() - 1;
        self.nodes[parent].children.push(idx);
        idx
    }

    fn render_search(&mut self) {
        self.reset();
        self.add_root(
            Node::new("input")
                .id(&locators::search_button())
                .action(Action::Search),
        );
    }

    fn render_page(&mut self, page: u32) {
        self.reset();
        self.current_page = Some(page);

        let table = self.add_root(Node::new("table").raw_id(TABLE_ID));
        self.table = Some(table);

        let header = self.add_child(table, Node::new("tr"));
        for label in HEADERS {
            self.add_child(header, Node::new("th").text(label));
        }

        let rows = self.pages[(page - 1) as usize].clone();
        for (index, row) in rows.iter().enumerate() {
            let tr = self.add_child(table, Node::new("tr"));
            let values = [
                row.facility.as_str(),
                row.date.as_str(),
                row.kind.as_str(),
                row.establishment.as_str(),
                "",
                "Map",
            ];
            for (position, value) in values.iter().enumerate().take(row.cell_count) {
                let td = self.add_child(tr, Node::new("td").text(*value));
                if position == 4 {
                    if let Some(overlay) = &row.overlay {
                        self.add_child(
                            td,
                            Node::new("a")
                                .text(format!("Violation(s) {}", overlay.violations.len()))
                                .action(Action::OpenOverlay { page, row: index }),
                        );
                    }
                }
            }
        }

        let footer = self.add_child(table, Node::new("tr"));
        self.add_child(footer, Node::new("td").text("Inspection results"));

        let pager = self.add_child(table, Node::new("tr"));
        let cell = self.add_child(pager, Node::new("td"));
        let links = self
            .pager_overrides
            .get(&page)
            .cloned()
            .unwrap_or_else(|| default_pager(page, self.pages.len()));
        for link in links {
            let mut node = Node::new("a")
                .text(link.text.clone())
                .action(Action::GoTo(link.target));
            node.href = Some(postback_href(link.target));
            node.stale_text = link.stale;
            self.add_child(cell, node);
        }
    }

    fn open_overlay(&mut self, page: u32, row: usize) {
        self.overlay_opens += 1;
        let Some(overlay) = self.pages[(page - 1) as usize][row].overlay.clone() else {
            return;
        };
        if !overlay.appears {
            return;
        }

        let root = self.add_root(Node::new("div").id(&locators::overlay_root()).overlay());
        if let Some(date) = &overlay.header_date {
            self.add_child(
                root,
                Node::new("span")
                    .id(&locators::overlay_header())
                    .text(format!("Inspection Violations: {date}")),
            );
        }
        if let Some(facility) = &overlay.facility {
            self.add_child(
                root,
                Node::new("span")
                    .id(&locators::facility_information())
                    .text(facility.clone()),
            );
        }
        for (index, violation) in overlay.violations.iter().enumerate() {
            self.add_child(
                root,
                Node::new("span")
                    .id(&locators::violation_code(index))
                    .text(violation.code.clone()),
            );
            if let Some(explanation) = &violation.explanation {
                self.add_child(
                    root,
                    Node::new("a")
                        .id(&locators::explanation_toggle(index))
                        .text("Code explanation")
                        .action(Action::Toggle(index)),
                );
                let panel = self.add_child(
                    root,
                    Node::new("div").id(&locators::explanation_panel(index)),
                );
                let outer = self.add_child(panel, Node::new("div"));
                let mut inner = Node::new("div").text(explanation.clone());
                inner.reveal_on = Some(index);
                self.add_child(outer, inner);
            }
            if let Some(comments) = &violation.comments {
                self.add_child(
                    root,
                    Node::new("div")
                        .id(&locators::comments_panel(index))
                        .text(format!("Inspector Comments\n{comments}")),
                );
            }
        }
        if overlay.closable {
            self.add_root(
                Node::new("button")
                    .id(&locators::overlay_close())
                    .action(Action::Close)
                    .overlay(),
            );
        }
    }

    fn close_overlay(&mut self) {
        for node in &mut self.nodes {
            if node.in_overlay {
                node.detached = true;
            }
        }
        let nodes = &self.nodes;
        self.roots.retain(|&idx| !nodes[idx].in_overlay);
    }

    fn perform(&mut self, action: Action) {
        match action {
            Action::None => {}
            Action::Search => self.render_page(1),
            Action::OpenOverlay { page, row } => self.open_overlay(page, row),
            Action::Toggle(index) => {
                self.expanded.insert(index);
            }
            Action::Close => self.close_overlay(),
            Action::GoTo(page) => {
                if !self.frozen_pagination {
                    self.render_page(page);
                }
            }
        }
    }

    fn check(&self, element: &FakeElement) -> Result<usize, BrowserError> {
        if element.generation != self.generation {
            return Err(BrowserError::Stale);
        }
        match self.nodes.get(element.node) {
            Some(node) if !node.detached => Ok(element.node),
            _ => Err(BrowserError::Stale),
        }
    }

    fn element(&self, node: usize) -> FakeElement {
        FakeElement {
            node,
            generation: self.generation,
        }
    }

    fn descendants(&self, parent: usize) -> Vec<usize> {
        let mut out = Vec::new();
        for &child in &self.nodes[parent].children {
            if self.nodes[child].detached {
                continue;
            }
            out.push(child);
            out.extend(self.descendants(child));
        }
        out
    }

    fn document(&self) -> Vec<usize> {
        let mut out = Vec::new();
        for &root in &self.roots {
            out.push(root);
            out.extend(self.descendants(root));
        }
        out
    }

    fn table_rows(&self) -> Vec<usize> {
        self.table
            .map(|t| {
                self.nodes[t]
                    .children
                    .iter()
                    .copied()
                    .filter(|&c| self.nodes[c].tag == "tr")
                    .collect()
            })
            .unwrap_or_default()
    }

    fn matches(&self, candidates: &[usize], selector: &Selector) -> Vec<usize> {
        match selector {
            Selector::Id(id) => candidates
                .iter()
                .copied()
                .filter(|&n| self.nodes[n].dom_id.as_deref() == Some(id.as_str()))
                .collect(),
            Selector::Tag(tag) => candidates
                .iter()
                .copied()
                .filter(|&n| self.nodes[n].tag == tag.as_str())
                .collect(),
            _ => Vec::new(),
        }
    }

    fn resolve_document(&self, selector: &Selector) -> Vec<usize> {
        if *selector == locators::pager_row() {
            return self.table_rows().last().copied().into_iter().collect();
        }
        if *selector == locators::anchor_row() {
            return self.table_rows().get(1).copied().into_iter().collect();
        }
        self.matches(&self.document(), selector)
    }

    fn resolve_within(&self, parent: usize, selector: &Selector) -> Vec<usize> {
        if *selector == locators::explanation_text() {
            let mut out = Vec::new();
            for &child in &self.nodes[parent].children {
                if self.nodes[child].tag != "div" {
                    continue;
                }
                for &grandchild in &self.nodes[child].children {
                    if self.nodes[grandchild].tag == "div" {
                        out.push(grandchild);
                    }
                }
            }
            return out;
        }
        self.matches(&self.descendants(parent), selector)
    }

    fn node_text(&self, node: usize) -> String {
        let n = &self.nodes[node];
        if let Some(index) = n.reveal_on {
            if !self.expanded.contains(&index) {
                return String::new();
            }
        }
        if !n.text.is_empty() {
            return n.text.clone();
        }
        n.children
            .iter()
            .map(|&c| self.node_text(c))
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

fn default_pager(page: u32, page_count: usize) -> Vec<PagerLink> {
    let page_count = u32::try_from(page_count).expect("page count fits u32");
    (1..=page_count)
        .filter(|&p| p != page)
        .map(|p| PagerLink::new(&p.to_string(), p))
        .collect()
}

pub struct FakeSite {
    state: RefCell<SiteState>,
}

impl FakeSite {
    pub fn new(pages: Vec<Vec<FakeRow>>) -> Self {
        Self {
            state: RefCell::new(SiteState {
                pages,
                ..SiteState::default()
            }),
        }
    }

    /// Pages of plain rows (no violations link) with the given sizes.
    pub fn with_page_sizes(sizes: &[usize]) -> Self {
        let pages = sizes
            .iter()
            .enumerate()
            .map(|(p, &size)| {
                (0..size)
                    .map(|r| FakeRow::plain(&format!("Establishment {}-{}", p + 1, r)))
                    .collect()
            })
            .collect();
        Self::new(pages)
    }

    /// Renders a results page directly, skipping the search form.
    pub fn show_page(&self, page: u32) {
        self.state.borrow_mut().render_page(page);
    }

    pub fn set_pager(&self, page: u32, links: Vec<PagerLink>) {
        self.state.borrow_mut().pager_overrides.insert(page, links);
    }

    /// The next `count` document lookups of `selector` fail as stale.
    pub fn inject_stale_lookups(&self, selector: Selector, count: u32) {
        self.state.borrow_mut().stale_lookups.insert(selector, count);
    }

    /// The next `count` row listings of the grid fail as stale.
    pub fn inject_stale_row_reads(&self, count: u32) {
        self.state.borrow_mut().stale_row_reads = count;
    }

    /// Pager clicks stop triggering a postback.
    pub fn freeze_pagination(&self) {
        self.state.borrow_mut().frozen_pagination = true;
    }

    pub fn lookup_count(&self, selector: &Selector) -> u32 {
        self.state
            .borrow()
            .lookups
            .get(selector)
            .copied()
            .unwrap_or(0)
    }

    pub fn current_page(&self) -> Option<u32> {
        self.state.borrow().current_page
    }

    pub fn overlay_open(&self) -> bool {
        let state = self.state.borrow();
        state
            .document()
            .iter()
            .any(|&n| state.nodes[n].dom_id.as_deref() == Some("tbPublicInspectionMain"))
    }

    pub fn overlay_opens(&self) -> u32 {
        self.state.borrow().overlay_opens
    }

    pub fn remaining_stale_row_reads(&self) -> u32 {
        self.state.borrow().stale_row_reads
    }
}

impl BrowserSurface for FakeSite {
    type Element = FakeElement;

    async fn navigate(&self, _url: &str) -> Result<(), BrowserError> {
        self.state.borrow_mut().render_search();
        Ok(())
    }

    async fn locate(&self, selector: &Selector) -> Result<Option<FakeElement>, BrowserError> {
        let mut state = self.state.borrow_mut();
        *state.lookups.entry(selector.clone()).or_insert(0) += 1;
        if let Some(remaining) = state.stale_lookups.get_mut(selector) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(BrowserError::Stale);
            }
        }
        Ok(state
            .resolve_document(selector)
            .first()
            .map(|&n| state.element(n)))
    }

    async fn locate_all(&self, selector: &Selector) -> Result<Vec<FakeElement>, BrowserError> {
        let state = self.state.borrow();
        Ok(state
            .resolve_document(selector)
            .into_iter()
            .map(|n| state.element(n))
            .collect())
    }

    async fn locate_within(
        &self,
        parent: &FakeElement,
        selector: &Selector,
    ) -> Result<Option<FakeElement>, BrowserError> {
        let state = self.state.borrow();
        let parent = state.check(parent)?;
        Ok(state
            .resolve_within(parent, selector)
            .first()
            .map(|&n| state.element(n)))
    }

    async fn locate_all_within(
        &self,
        parent: &FakeElement,
        selector: &Selector,
    ) -> Result<Vec<FakeElement>, BrowserError> {
        let mut state = self.state.borrow_mut();
        let parent = state.check(parent)?;
        if Some(parent) == state.table
            && *selector == Selector::tag("tr")
            && state.stale_row_reads > 0
        {
            state.stale_row_reads -= 1;
            return Err(BrowserError::Stale);
        }
        Ok(state
            .resolve_within(parent, selector)
            .into_iter()
            .map(|n| state.element(n))
            .collect())
    }

    async fn click(&self, element: &FakeElement) -> Result<(), BrowserError> {
        let mut state = self.state.borrow_mut();
        let node = state.check(element)?;
        let action = state.nodes[node].action;
        state.perform(action);
        Ok(())
    }

    async fn scripted_click(&self, element: &FakeElement) -> Result<(), BrowserError> {
        self.click(element).await
    }

    async fn read_text(&self, element: &FakeElement) -> Result<String, BrowserError> {
        let state = self.state.borrow();
        let node = state.check(element)?;
        if state.nodes[node].stale_text {
            return Err(BrowserError::Stale);
        }
        Ok(state.node_text(node))
    }

    async fn read_attribute(
        &self,
        element: &FakeElement,
        name: &str,
    ) -> Result<Option<String>, BrowserError> {
        let state = self.state.borrow();
        let node = state.check(element)?;
        Ok(match name {
            "href" => state.nodes[node].href.clone(),
            "id" => state.nodes[node].dom_id.clone(),
            _ => None,
        })
    }

    async fn is_stale(&self, element: &FakeElement) -> Result<bool, BrowserError> {
        Ok(self.state.borrow().check(element).is_err())
    }
}

/// In-memory sink that records its length after every append.
#[derive(Debug, Default)]
pub struct RecordingSink {
    pub records: Vec<InspectionRecord>,
    pub history: Vec<usize>,
    pub fail_at: Option<usize>,
}

impl RecordSink for RecordingSink {
    fn append(&mut self, record: InspectionRecord) -> Result<(), SinkError> {
        if self.fail_at == Some(self.records.len()) {
            return Err(SinkError::Io {
                path: PathBuf::from("memory"),
                source: std::io::Error::other("disk full"),
            });
        }
        self.records.push(record);
        self.history.push(self.records.len());
        Ok(())
    }

    fn len(&self) -> usize {
        self.records.len()
    }
}

/// Short timeouts; tests run on a paused clock so they cost no real time.
pub fn test_config() -> AppConfig {
    AppConfig {
        search_url: "http://fake.test/search".to_owned(),
        initial_load_timeout_secs: 3,
        page_wait_timeout_secs: 2,
        row_wait_timeout_secs: 2,
        overlay_wait_timeout_secs: 2,
        probe_timeout_secs: 1,
        max_retries: 3,
        ..AppConfig::default()
    }
}

pub fn scratch_path(name: &str) -> PathBuf {
    std::env::temp_dir()
        .join(format!("kdafs-test-{}", uuid::Uuid::new_v4()))
        .join(name)
}
