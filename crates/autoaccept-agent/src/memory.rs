//! In-memory page used to exercise the automation without a browser.
//!
//! `MemoryPage` models just enough of a DOM for the session logic: a node
//! tree with tags, text and attributes, a small CSS selector matcher
//! (tag, `.class`, `#id`, `[attr]`, `[attr="v"]`, `[attr*="v"]`, compound
//! selectors, descendant combinator, comma lists) and scripted reactions to
//! clicks.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::error::InspectError;
use crate::inspector::{ElementHandle, ElementSnapshot, Layout, PageInspector};
use crate::overlay::{OverlaySurface, StatusCard};

/// Reaction applied to the page when a given element is clicked.
#[derive(Debug, Clone, PartialEq)]
pub enum ClickAction {
    /// Remove a subtree from the document.
    Detach(ElementHandle),
    /// Put a previously detached subtree back.
    Attach(ElementHandle),
    /// Replace an element's own text.
    SetText(ElementHandle, String),
}

/// Description of a node to append.
#[derive(Debug, Clone)]
pub struct NodeSpec {
    tag: String,
    text: String,
    attributes: HashMap<String, String>,
    hidden: bool,
    disabled: bool,
    size: (f64, f64),
}

impl NodeSpec {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into().to_lowercase(),
            text: String::new(),
            attributes: HashMap::new(),
            hidden: false,
            disabled: false,
            size: (80.0, 24.0),
        }
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn class(self, class: impl Into<String>) -> Self {
        self.attr("class", class)
    }

    pub fn id(self, id: impl Into<String>) -> Self {
        self.attr("id", id)
    }

    pub fn role(self, role: impl Into<String>) -> Self {
        self.attr("role", role)
    }

    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.disabled = true;
        self
    }

    pub fn size(mut self, width: f64, height: f64) -> Self {
        self.size = (width, height);
        self
    }
}

#[derive(Debug)]
struct Node {
    spec: NodeSpec,
    parent: Option<usize>,
    children: Vec<usize>,
    detached: bool,
}

#[derive(Debug, Default)]
struct OverlayRecord {
    mounted: bool,
    panel: Option<String>,
    cards: Vec<StatusCard>,
    mounts: usize,
    dismounts: usize,
}

#[derive(Debug, Default)]
struct Dom {
    nodes: Vec<Node>,
    on_click: HashMap<usize, Vec<ClickAction>>,
    clicks: Vec<ElementHandle>,
    failing: HashSet<usize>,
    overlay: OverlayRecord,
}

/// Shared in-memory document. Clones refer to the same page.
#[derive(Debug, Clone)]
pub struct MemoryPage {
    dom: Arc<Mutex<Dom>>,
}

impl Default for MemoryPage {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryPage {
    /// A page holding only a `body` root.
    pub fn new() -> Self {
        let root = Node {
            spec: NodeSpec::new("body"),
            parent: None,
            children: Vec::new(),
            detached: false,
        };
        Self {
            dom: Arc::new(Mutex::new(Dom {
                nodes: vec![root],
                ..Dom::default()
            })),
        }
    }

    pub fn root(&self) -> ElementHandle {
        ElementHandle(0)
    }

    /// Append a child and return its handle.
    pub fn append(&self, parent: ElementHandle, spec: NodeSpec) -> ElementHandle {
        let mut dom = self.dom.lock();
        let parent_idx = parent.0 as usize;
        let idx = dom.nodes.len();
        dom.nodes.push(Node {
            spec,
            parent: Some(parent_idx),
            children: Vec::new(),
            detached: false,
        });
        if let Some(p) = dom.nodes.get_mut(parent_idx) {
            p.children.push(idx);
        }
        ElementHandle(idx as u64)
    }

    pub fn on_click(&self, handle: ElementHandle, actions: Vec<ClickAction>) {
        self.dom.lock().on_click.insert(handle.0 as usize, actions);
    }

    pub fn detach(&self, handle: ElementHandle) {
        self.set_detached(handle, true);
    }

    pub fn attach(&self, handle: ElementHandle) {
        self.set_detached(handle, false);
    }

    pub fn set_text(&self, handle: ElementHandle, text: impl Into<String>) {
        if let Some(node) = self.dom.lock().nodes.get_mut(handle.0 as usize) {
            node.spec.text = text.into();
        }
    }

    pub fn set_attr(&self, handle: ElementHandle, name: &str, value: &str) {
        if let Some(node) = self.dom.lock().nodes.get_mut(handle.0 as usize) {
            node.spec.attributes.insert(name.to_string(), value.to_string());
        }
    }

    /// Make `describe` of this element fail with a script error.
    pub fn fail_describe(&self, handle: ElementHandle) {
        self.dom.lock().failing.insert(handle.0 as usize);
    }

    /// Every click dispatched so far, in order.
    pub fn clicks(&self) -> Vec<ElementHandle> {
        self.dom.lock().clicks.clone()
    }

    pub fn click_count(&self, handle: ElementHandle) -> usize {
        self.dom.lock().clicks.iter().filter(|h| **h == handle).count()
    }

    pub fn overlay_mounted(&self) -> bool {
        self.dom.lock().overlay.mounted
    }

    pub fn overlay_panel(&self) -> Option<String> {
        self.dom.lock().overlay.panel.clone()
    }

    pub fn overlay_cards(&self) -> Vec<StatusCard> {
        self.dom.lock().overlay.cards.clone()
    }

    pub fn overlay_mounts(&self) -> usize {
        self.dom.lock().overlay.mounts
    }

    pub fn overlay_dismounts(&self) -> usize {
        self.dom.lock().overlay.dismounts
    }

    fn set_detached(&self, handle: ElementHandle, detached: bool) {
        if let Some(node) = self.dom.lock().nodes.get_mut(handle.0 as usize) {
            node.detached = detached;
        }
    }
}

impl Dom {
    fn connected(&self, idx: usize) -> bool {
        let mut current = Some(idx);
        while let Some(i) = current {
            match self.nodes.get(i) {
                Some(node) if !node.detached => current = node.parent,
                _ => return false,
            }
        }
        true
    }

    fn live(&self, handle: ElementHandle) -> Result<usize, InspectError> {
        let idx = handle.0 as usize;
        if idx < self.nodes.len() && self.connected(idx) {
            Ok(idx)
        } else {
            Err(InspectError::StaleHandle(handle.0))
        }
    }

    fn displayed(&self, idx: usize) -> bool {
        let mut current = Some(idx);
        while let Some(i) = current {
            let node = &self.nodes[i];
            if node.spec.hidden {
                return false;
            }
            current = node.parent;
        }
        true
    }

    fn text(&self, idx: usize) -> String {
        let node = &self.nodes[idx];
        let mut parts = Vec::new();
        let own = node.spec.text.trim();
        if !own.is_empty() {
            parts.push(own.to_string());
        }
        for &child in &node.children {
            if self.nodes[child].detached {
                continue;
            }
            let text = self.text(child);
            if !text.is_empty() {
                parts.push(text);
            }
        }
        parts.join("\n")
    }

    fn snapshot(&self, idx: usize, with_text: bool) -> ElementSnapshot {
        let node = &self.nodes[idx];
        let displayed = self.displayed(idx);
        let (width, height) = if displayed { node.spec.size } else { (0.0, 0.0) };
        ElementSnapshot {
            handle: ElementHandle(idx as u64),
            tag: node.spec.tag.clone(),
            text: if with_text { self.text(idx) } else { String::new() },
            attributes: node.spec.attributes.clone(),
            layout: Layout { width, height, displayed },
            disabled: node.spec.disabled || node.spec.attributes.contains_key("disabled"),
        }
    }

    /// Connected descendants of `idx` in document order, excluding `idx`.
    fn descendants(&self, idx: usize, out: &mut Vec<usize>) {
        for &child in &self.nodes[idx].children {
            if self.nodes[child].detached {
                continue;
            }
            out.push(child);
            self.descendants(child, out);
        }
    }

    fn matches_any(&self, idx: usize, selectors: &[Vec<Compound>]) -> bool {
        selectors.iter().any(|chain| self.matches_chain(idx, chain))
    }

    fn matches_chain(&self, idx: usize, chain: &[Compound]) -> bool {
        let Some((last, rest)) = chain.split_last() else {
            return false;
        };
        if !last.matches(&self.nodes[idx].spec) {
            return false;
        }
        let mut current = self.nodes[idx].parent;
        for compound in rest.iter().rev() {
            loop {
                let Some(p) = current else {
                    return false;
                };
                current = self.nodes[p].parent;
                if compound.matches(&self.nodes[p].spec) {
                    break;
                }
            }
        }
        true
    }
}

#[async_trait]
impl PageInspector for MemoryPage {
    async fn find_candidates(&self, selectors: &[String]) -> Result<Vec<ElementHandle>, InspectError> {
        let parsed = parse_all(selectors)?;
        let dom = self.dom.lock();
        let mut all = vec![0];
        dom.descendants(0, &mut all);
        Ok(all
            .into_iter()
            .filter(|&idx| dom.matches_any(idx, &parsed))
            .map(|idx| ElementHandle(idx as u64))
            .collect())
    }

    async fn describe(&self, handle: ElementHandle) -> Result<ElementSnapshot, InspectError> {
        let dom = self.dom.lock();
        let idx = dom.live(handle)?;
        if dom.failing.contains(&idx) {
            return Err(InspectError::Script(format!("describe failed for {}", handle)));
        }
        Ok(dom.snapshot(idx, true))
    }

    async fn ancestors_of(
        &self,
        handle: ElementHandle,
        max_depth: usize,
    ) -> Result<Vec<ElementSnapshot>, InspectError> {
        let dom = self.dom.lock();
        let idx = dom.live(handle)?;
        let mut out = Vec::new();
        let mut current = dom.nodes[idx].parent;
        while let Some(p) = current {
            if out.len() >= max_depth {
                break;
            }
            out.push(dom.snapshot(p, false));
            current = dom.nodes[p].parent;
        }
        Ok(out)
    }

    async fn previous_siblings(
        &self,
        handle: ElementHandle,
        limit: usize,
    ) -> Result<Vec<ElementSnapshot>, InspectError> {
        let dom = self.dom.lock();
        let idx = dom.live(handle)?;
        let Some(parent) = dom.nodes[idx].parent else {
            return Ok(Vec::new());
        };
        let siblings = &dom.nodes[parent].children;
        let position = siblings.iter().position(|&c| c == idx).unwrap_or(0);
        Ok(siblings[..position]
            .iter()
            .rev()
            .filter(|&&s| !dom.nodes[s].detached)
            .take(limit)
            .map(|&s| dom.snapshot(s, true))
            .collect())
    }

    async fn find_within(
        &self,
        handle: ElementHandle,
        selectors: &[String],
    ) -> Result<Vec<ElementSnapshot>, InspectError> {
        let parsed = parse_all(selectors)?;
        let dom = self.dom.lock();
        let idx = dom.live(handle)?;
        let mut all = Vec::new();
        dom.descendants(idx, &mut all);
        Ok(all
            .into_iter()
            .filter(|&i| dom.matches_any(i, &parsed))
            .map(|i| dom.snapshot(i, true))
            .collect())
    }

    async fn click(&self, handle: ElementHandle) -> Result<(), InspectError> {
        let mut dom = self.dom.lock();
        let idx = dom.live(handle)?;
        dom.clicks.push(handle);
        let actions = dom.on_click.get(&idx).cloned().unwrap_or_default();
        for action in actions {
            match action {
                ClickAction::Detach(h) => {
                    if let Some(node) = dom.nodes.get_mut(h.0 as usize) {
                        node.detached = true;
                    }
                }
                ClickAction::Attach(h) => {
                    if let Some(node) = dom.nodes.get_mut(h.0 as usize) {
                        node.detached = false;
                    }
                }
                ClickAction::SetText(h, text) => {
                    if let Some(node) = dom.nodes.get_mut(h.0 as usize) {
                        node.spec.text = text;
                    }
                }
            }
        }
        Ok(())
    }
}

#[async_trait]
impl OverlaySurface for MemoryPage {
    async fn mount(&self, panel_selectors: &[String]) -> Result<(), InspectError> {
        let mut panel = None;
        for selector in panel_selectors {
            if !self.find_candidates(std::slice::from_ref(selector)).await?.is_empty() {
                panel = Some(selector.clone());
                break;
            }
        }
        let mut dom = self.dom.lock();
        if !dom.overlay.mounted {
            dom.overlay.mounted = true;
            dom.overlay.mounts += 1;
        }
        dom.overlay.panel = panel;
        Ok(())
    }

    async fn render(&self, cards: &[StatusCard]) -> Result<(), InspectError> {
        let mut dom = self.dom.lock();
        if dom.overlay.mounted {
            dom.overlay.cards = cards.to_vec();
        }
        Ok(())
    }

    async fn dismount(&self) -> Result<(), InspectError> {
        let mut dom = self.dom.lock();
        dom.overlay.mounted = false;
        dom.overlay.panel = None;
        dom.overlay.cards.clear();
        dom.overlay.dismounts += 1;
        Ok(())
    }
}

// Selector matching

#[derive(Debug, Clone, PartialEq)]
enum AttrOp {
    Exists,
    Equals(String),
    Contains(String),
}

#[derive(Debug, Clone, Default)]
struct Compound {
    tag: Option<String>,
    ids: Vec<String>,
    classes: Vec<String>,
    attrs: Vec<(String, AttrOp)>,
}

impl Compound {
    fn matches(&self, spec: &NodeSpec) -> bool {
        if let Some(tag) = &self.tag {
            if *tag != spec.tag {
                return false;
            }
        }
        let id = spec.attributes.get("id").map(String::as_str).unwrap_or("");
        if self.ids.iter().any(|want| want != id) {
            return false;
        }
        let class = spec.attributes.get("class").map(String::as_str).unwrap_or("");
        if !self
            .classes
            .iter()
            .all(|want| class.split_whitespace().any(|c| c == want))
        {
            return false;
        }
        self.attrs.iter().all(|(name, op)| match (spec.attributes.get(name), op) {
            (None, _) => false,
            (Some(_), AttrOp::Exists) => true,
            (Some(v), AttrOp::Equals(want)) => v == want,
            (Some(v), AttrOp::Contains(want)) => v.contains(want.as_str()),
        })
    }
}

fn parse_all(selectors: &[String]) -> Result<Vec<Vec<Compound>>, InspectError> {
    let mut out = Vec::new();
    for selector in selectors {
        for group in split_top_level(selector, ',') {
            out.push(parse_chain(&group)?);
        }
    }
    Ok(out)
}

/// Split on `sep` outside brackets, quotes and escapes.
fn split_top_level(input: &str, sep: char) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;
    let mut depth = 0usize;
    let mut chars = input.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                current.push(c);
                if let Some(next) = chars.next() {
                    current.push(next);
                }
                continue;
            }
            '"' | '\'' if quote == Some(c) => quote = None,
            '"' | '\'' if quote.is_none() => quote = Some(c),
            '[' if quote.is_none() => depth += 1,
            ']' if quote.is_none() => depth = depth.saturating_sub(1),
            _ if c == sep && quote.is_none() && depth == 0 => {
                let part = current.trim().to_string();
                if !part.is_empty() {
                    parts.push(part);
                }
                current.clear();
                continue;
            }
            _ => {}
        }
        current.push(c);
    }
    let part = current.trim().to_string();
    if !part.is_empty() {
        parts.push(part);
    }
    parts
}

fn parse_chain(selector: &str) -> Result<Vec<Compound>, InspectError> {
    let mut chain = Vec::new();
    for token in split_top_level(selector, ' ') {
        // Child combinators are matched as descendants.
        if token == ">" {
            continue;
        }
        chain.push(parse_compound(&token)?);
    }
    if chain.is_empty() {
        return Err(invalid(selector));
    }
    Ok(chain)
}

fn parse_compound(token: &str) -> Result<Compound, InspectError> {
    let chars: Vec<char> = token.chars().collect();
    let mut compound = Compound::default();
    let (tag, mut i) = read_ident(&chars, 0);
    if !tag.is_empty() {
        compound.tag = Some(tag.to_lowercase());
    } else if chars.first() == Some(&'*') {
        i = 1;
    }
    while i < chars.len() {
        match chars[i] {
            '.' | '#' => {
                let (name, next) = read_ident(&chars, i + 1);
                if name.is_empty() {
                    return Err(invalid(token));
                }
                if chars[i] == '.' {
                    compound.classes.push(name);
                } else {
                    compound.ids.push(name);
                }
                i = next;
            }
            '[' => {
                let end = closing_bracket(&chars, i).ok_or_else(|| invalid(token))?;
                let inner: String = chars[i + 1..end].iter().collect();
                compound.attrs.push(parse_attr(&inner).ok_or_else(|| invalid(token))?);
                i = end + 1;
            }
            _ => return Err(invalid(token)),
        }
    }
    Ok(compound)
}

fn read_ident(chars: &[char], mut i: usize) -> (String, usize) {
    let mut ident = String::new();
    while i < chars.len() {
        let c = chars[i];
        if c == '\\' && i + 1 < chars.len() {
            ident.push(chars[i + 1]);
            i += 2;
        } else if c.is_alphanumeric() || c == '-' || c == '_' {
            ident.push(c);
            i += 1;
        } else {
            break;
        }
    }
    (ident, i)
}

fn closing_bracket(chars: &[char], open: usize) -> Option<usize> {
    let mut quote: Option<char> = None;
    for (i, &c) in chars.iter().enumerate().skip(open + 1) {
        match c {
            '"' | '\'' if quote == Some(c) => quote = None,
            '"' | '\'' if quote.is_none() => quote = Some(c),
            ']' if quote.is_none() => return Some(i),
            _ => {}
        }
    }
    None
}

fn parse_attr(inner: &str) -> Option<(String, AttrOp)> {
    if let Some((name, value)) = inner.split_once("*=") {
        return Some((name.trim().to_string(), AttrOp::Contains(unquote(value)?)));
    }
    if let Some((name, value)) = inner.split_once('=') {
        return Some((name.trim().to_string(), AttrOp::Equals(unquote(value)?)));
    }
    let name = inner.trim();
    (!name.is_empty()).then(|| (name.to_string(), AttrOp::Exists))
}

fn unquote(value: &str) -> Option<String> {
    let value = value.trim();
    let bytes = value.as_bytes();
    if bytes.len() >= 2 && (bytes[0] == b'"' || bytes[0] == b'\'') {
        if bytes[bytes.len() - 1] != bytes[0] {
            return None;
        }
        return Some(value[1..value.len() - 1].to_string());
    }
    Some(value.to_string())
}

fn invalid(selector: &str) -> InspectError {
    InspectError::Script(format!("invalid selector: {}", selector))
}
