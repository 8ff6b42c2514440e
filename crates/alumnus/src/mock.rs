//! In-memory [`UiDriver`] for tests.
//!
//! A [`MockPage`] is a flat arena of [`MockNode`]s linked by parent index.
//! Nodes match a selector when the selector text is one of their registered
//! locators or equals their tag name, and are returned in insertion order.
//! Clicks and typing can trigger [`Effect`]s, which is how a test scripts a
//! panel opening, a dialog closing, or a submit button becoming enabled.

use crate::driver::{ElementHandle, Key, UiDriver};
use crate::locator::Selector;
use crate::result::{AlumnusError, AlumnusResult};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Index of a node in its page
pub type NodeId = usize;

/// How a node reacts to clicks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClickBehavior {
    /// Native and programmatic clicks both work
    #[default]
    Accept,
    /// Native clicks are intercepted by an overlay; programmatic clicks work
    InterceptNative,
    /// Every click fails
    FailAlways,
    /// Every click reports a stale reference
    Stale,
}

/// Page mutation triggered by a click or by input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Remove the node (and its subtree) from the page
    Detach(NodeId),
    /// Re-insert a detached node
    Attach(NodeId),
    /// Make the node visible
    Show(NodeId),
    /// Hide the node
    Hide(NodeId),
    /// Enable the node
    Enable(NodeId),
    /// Disable the node
    Disable(NodeId),
    /// Move input focus to the node
    Focus(NodeId),
}

/// A node in the mock page
#[derive(Debug, Clone)]
pub struct MockNode {
    /// Parent node
    pub parent: Option<NodeId>,
    /// Tag name, matched by bare-tag selectors such as `form`
    pub tag: String,
    /// Locator strings that match this node
    pub selectors: Vec<String>,
    /// Visible text
    pub text: String,
    /// Rendered and visible
    pub visible: bool,
    /// Accepts interaction
    pub enabled: bool,
    /// Accepts text input
    pub editable: bool,
    /// Present in the page
    pub attached: bool,
    /// Typed content
    pub content: String,
    /// Click reaction
    pub click: ClickBehavior,
    /// Effects applied after a successful click
    pub on_click: Vec<Effect>,
    /// Effects applied after any input
    pub on_input: Vec<Effect>,
}

impl MockNode {
    /// Visible, enabled, attached node with the given tag
    #[must_use]
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            parent: None,
            tag: tag.into(),
            selectors: Vec::new(),
            text: String::new(),
            visible: true,
            enabled: true,
            editable: false,
            attached: true,
            content: String::new(),
            click: ClickBehavior::Accept,
            on_click: Vec::new(),
            on_input: Vec::new(),
        }
    }

    /// Make a selector match this node
    #[must_use]
    pub fn matching(mut self, selector: impl Into<String>) -> Self {
        self.selectors.push(selector.into());
        self
    }

    #[must_use]
    pub fn child_of(mut self, parent: NodeId) -> Self {
        self.parent = Some(parent);
        self
    }

    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    #[must_use]
    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    #[must_use]
    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    #[must_use]
    pub fn editable(mut self) -> Self {
        self.editable = true;
        self
    }

    /// Start outside the page; an [`Effect::Attach`] brings it in
    #[must_use]
    pub fn detached(mut self) -> Self {
        self.attached = false;
        self
    }

    #[must_use]
    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = content.into();
        self
    }

    #[must_use]
    pub fn with_click(mut self, behavior: ClickBehavior) -> Self {
        self.click = behavior;
        self
    }

    #[must_use]
    pub fn on_click(mut self, effect: Effect) -> Self {
        self.on_click.push(effect);
        self
    }

    #[must_use]
    pub fn on_input(mut self, effect: Effect) -> Self {
        self.on_input.push(effect);
        self
    }

    fn matches(&self, selector: &Selector) -> bool {
        let raw = selector.as_str();
        self.tag == raw || self.selectors.iter().any(|s| s == raw)
    }
}

/// A page: nodes in document order
#[derive(Debug, Clone, Default)]
pub struct MockPage {
    /// Nodes, indexed by [`NodeId`]
    pub nodes: Vec<MockNode>,
}

impl MockPage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a node and return its id
    pub fn add(&mut self, node: MockNode) -> NodeId {
        self.nodes.push(node);
        self.nodes.len() - 1
    }

    fn in_page(&self, id: NodeId) -> bool {
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            match self.nodes.get(current) {
                Some(node) if node.attached => cursor = node.parent,
                _ => return false,
            }
        }
        true
    }

    fn rendered(&self, id: NodeId) -> bool {
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            match self.nodes.get(current) {
                Some(node) if node.attached && node.visible => cursor = node.parent,
                _ => return false,
            }
        }
        true
    }

    fn is_descendant(&self, id: NodeId, ancestor: NodeId) -> bool {
        let mut cursor = self.nodes.get(id).and_then(|n| n.parent);
        while let Some(current) = cursor {
            if current == ancestor {
                return true;
            }
            cursor = self.nodes.get(current).and_then(|n| n.parent);
        }
        false
    }

    fn apply(&mut self, effects: &[Effect], focus: &mut Option<NodeId>) {
        for effect in effects {
            match *effect {
                Effect::Detach(id) => self.update(id, |n| n.attached = false),
                Effect::Attach(id) => self.update(id, |n| n.attached = true),
                Effect::Show(id) => self.update(id, |n| n.visible = true),
                Effect::Hide(id) => self.update(id, |n| n.visible = false),
                Effect::Enable(id) => self.update(id, |n| n.enabled = true),
                Effect::Disable(id) => self.update(id, |n| n.enabled = false),
                Effect::Focus(id) => *focus = Some(id),
            }
        }
    }

    fn update(&mut self, id: NodeId, change: impl FnOnce(&mut MockNode)) {
        if let Some(node) = self.nodes.get_mut(id) {
            change(node);
        }
    }
}

#[derive(Debug)]
struct MockState {
    url: String,
    page: MockPage,
    generation: u64,
    focus: Option<NodeId>,
    pages: HashMap<String, MockPage>,
    redirects: HashMap<String, String>,
    failing_urls: Vec<String>,
    alive: bool,
    call_history: Vec<String>,
    clicks: HashMap<NodeId, usize>,
}

/// Mock driver over a scriptable page
#[derive(Debug)]
pub struct MockDriver {
    state: Mutex<MockState>,
}

impl Default for MockDriver {
    fn default() -> Self {
        Self::with_page(MockPage::new())
    }
}

impl MockDriver {
    /// Create new mock driver on an empty page
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mock driver showing `page`
    #[must_use]
    pub fn with_page(page: MockPage) -> Self {
        Self {
            state: Mutex::new(MockState {
                url: "about:blank".to_string(),
                page,
                generation: 0,
                focus: None,
                pages: HashMap::new(),
                redirects: HashMap::new(),
                failing_urls: Vec::new(),
                alive: true,
                call_history: Vec::new(),
                clicks: HashMap::new(),
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Page shown after navigating to `url`
    pub fn add_page(&self, url: impl Into<String>, page: MockPage) {
        let _ = self.state().pages.insert(url.into(), page);
    }

    /// Send navigation to `from` on to `to`
    pub fn redirect(&self, from: impl Into<String>, to: impl Into<String>) {
        let _ = self.state().redirects.insert(from.into(), to.into());
    }

    /// Make navigation to `url` fail
    pub fn fail_navigation(&self, url: impl Into<String>) {
        self.state().failing_urls.push(url.into());
    }

    /// Add a node to the current page
    pub fn add_node(&self, node: MockNode) -> NodeId {
        self.state().page.add(node)
    }

    /// Move input focus
    pub fn set_focus(&self, id: Option<NodeId>) {
        self.state().focus = id;
    }

    /// Simulate the browser going away
    pub fn set_alive(&self, alive: bool) {
        self.state().alive = alive;
    }

    /// Handle for a node of the current page
    #[must_use]
    pub fn handle(&self, id: NodeId) -> ElementHandle {
        let generation = self.state().generation;
        ElementHandle::new(format!("node-{generation}-{id}"), "mock")
    }

    /// Get call history
    #[must_use]
    pub fn history(&self) -> Vec<String> {
        self.state().call_history.clone()
    }

    /// Check if method was called
    #[must_use]
    pub fn was_called(&self, method: &str) -> bool {
        self.state().call_history.iter().any(|c| c.starts_with(method))
    }

    /// Successful clicks (native or programmatic) on a node
    #[must_use]
    pub fn clicks(&self, id: NodeId) -> usize {
        self.state().clicks.get(&id).copied().unwrap_or(0)
    }

    /// Current content of a node
    #[must_use]
    pub fn content(&self, id: NodeId) -> String {
        self.state()
            .page
            .nodes
            .get(id)
            .map(|n| n.content.clone())
            .unwrap_or_default()
    }

    /// Whether a node is still in the page
    #[must_use]
    pub fn is_attached(&self, id: NodeId) -> bool {
        self.state().page.in_page(id)
    }

    /// Number of rendered nodes a selector matches
    #[must_use]
    pub fn visible_count(&self, selector: &Selector) -> usize {
        let state = self.state();
        let page = &state.page;
        (0..page.nodes.len())
            .filter(|&id| page.nodes[id].matches(selector) && page.rendered(id))
            .count()
    }

    fn resolve_id(state: &MockState, handle: &ElementHandle) -> AlumnusResult<NodeId> {
        let stale = || AlumnusError::StaleElement {
            id: handle.id.clone(),
        };
        let rest = handle.id.strip_prefix("node-").ok_or_else(stale)?;
        let (generation, index) = rest.split_once('-').ok_or_else(stale)?;
        if generation.parse::<u64>().ok() != Some(state.generation) {
            return Err(stale());
        }
        let id: NodeId = index.parse().map_err(|_| stale())?;
        if state.page.in_page(id) {
            Ok(id)
        } else {
            Err(stale())
        }
    }

    fn handles(state: &MockState, ids: impl Iterator<Item = NodeId>, selector: &Selector) -> Vec<ElementHandle> {
        ids.map(|id| {
            ElementHandle::new(
                format!("node-{}-{id}", state.generation),
                selector.as_str(),
            )
        })
        .collect()
    }

    fn record_click(state: &mut MockState, id: NodeId) {
        *state.clicks.entry(id).or_insert(0) += 1;
        let effects = state.page.nodes[id].on_click.clone();
        let MockState { page, focus, .. } = &mut *state;
        page.apply(&effects, focus);
        if state.page.nodes[id].editable {
            state.focus = Some(id);
        }
    }

    fn record_input(state: &mut MockState, id: NodeId) {
        let effects = state.page.nodes[id].on_input.clone();
        let MockState { page, focus, .. } = &mut *state;
        page.apply(&effects, focus);
    }
}

#[async_trait]
impl UiDriver for MockDriver {
    async fn navigate(&self, url: &str) -> AlumnusResult<()> {
        let mut state = self.state();
        state.call_history.push(format!("navigate:{url}"));
        if state.failing_urls.iter().any(|u| u == url) {
            return Err(AlumnusError::NavigationError {
                url: url.to_string(),
                message: "net::ERR_CONNECTION_RESET".to_string(),
            });
        }
        let landed = state.redirects.get(url).cloned().unwrap_or_else(|| url.to_string());
        if let Some(page) = state.pages.get(&landed).cloned() {
            state.page = page;
            state.generation += 1;
            state.focus = None;
            state.clicks.clear();
        }
        state.url = landed;
        Ok(())
    }

    async fn current_url(&self) -> AlumnusResult<String> {
        Ok(self.state().url.clone())
    }

    async fn find_all(&self, selector: &Selector) -> AlumnusResult<Vec<ElementHandle>> {
        let state = self.state();
        let page = &state.page;
        let ids = (0..page.nodes.len()).filter(|&id| page.nodes[id].matches(selector) && page.in_page(id));
        Ok(Self::handles(&state, ids, selector))
    }

    async fn find_within(
        &self,
        scope: &ElementHandle,
        selector: &Selector,
    ) -> AlumnusResult<Vec<ElementHandle>> {
        let state = self.state();
        let root = Self::resolve_id(&state, scope)?;
        let page = &state.page;
        let ids = (0..page.nodes.len()).filter(|&id| {
            page.nodes[id].matches(selector) && page.in_page(id) && page.is_descendant(id, root)
        });
        Ok(Self::handles(&state, ids, selector))
    }

    async fn closest(
        &self,
        element: &ElementHandle,
        selector: &Selector,
    ) -> AlumnusResult<Option<ElementHandle>> {
        let state = self.state();
        let mut cursor = Some(Self::resolve_id(&state, element)?);
        while let Some(current) = cursor {
            let node = &state.page.nodes[current];
            if node.matches(selector) {
                return Ok(Self::handles(&state, std::iter::once(current), selector)
                    .into_iter()
                    .next());
            }
            cursor = node.parent;
        }
        Ok(None)
    }

    async fn focused_element(&self) -> AlumnusResult<Option<ElementHandle>> {
        let state = self.state();
        Ok(state
            .focus
            .filter(|&id| state.page.in_page(id))
            .map(|id| {
                ElementHandle::new(
                    format!("node-{}-{id}", state.generation),
                    "document.activeElement",
                )
            }))
    }

    async fn is_displayed(&self, element: &ElementHandle) -> AlumnusResult<bool> {
        let state = self.state();
        let id = Self::resolve_id(&state, element)?;
        Ok(state.page.rendered(id))
    }

    async fn is_enabled(&self, element: &ElementHandle) -> AlumnusResult<bool> {
        let state = self.state();
        let id = Self::resolve_id(&state, element)?;
        Ok(state.page.nodes[id].enabled)
    }

    async fn is_editable(&self, element: &ElementHandle) -> AlumnusResult<bool> {
        let state = self.state();
        let id = Self::resolve_id(&state, element)?;
        Ok(state.page.nodes[id].editable)
    }

    async fn text(&self, element: &ElementHandle) -> AlumnusResult<String> {
        let state = self.state();
        let id = Self::resolve_id(&state, element)?;
        let page = &state.page;
        let mut text = page.nodes[id].text.clone();
        for child in (0..page.nodes.len()).filter(|&c| page.is_descendant(c, id) && page.in_page(c)) {
            if !page.nodes[child].text.is_empty() {
                if !text.is_empty() {
                    text.push('\n');
                }
                text.push_str(&page.nodes[child].text);
            }
        }
        Ok(text)
    }

    async fn scroll_into_view(&self, element: &ElementHandle) -> AlumnusResult<()> {
        let mut state = self.state();
        let _ = Self::resolve_id(&state, element)?;
        state.call_history.push(format!("scroll:{}", element.id));
        Ok(())
    }

    async fn click(&self, element: &ElementHandle) -> AlumnusResult<()> {
        let mut state = self.state();
        state.call_history.push(format!("click:{}", element.id));
        let id = Self::resolve_id(&state, element)?;
        match state.page.nodes[id].click {
            ClickBehavior::Accept => {
                Self::record_click(&mut state, id);
                Ok(())
            }
            ClickBehavior::InterceptNative => Err(AlumnusError::ClickIntercepted {
                id: element.id.clone(),
                message: "overlay covers the click point".to_string(),
            }),
            ClickBehavior::FailAlways => Err(AlumnusError::driver("element not clickable")),
            ClickBehavior::Stale => Err(AlumnusError::StaleElement {
                id: element.id.clone(),
            }),
        }
    }

    async fn js_click(&self, element: &ElementHandle) -> AlumnusResult<()> {
        let mut state = self.state();
        state.call_history.push(format!("js_click:{}", element.id));
        let id = Self::resolve_id(&state, element)?;
        match state.page.nodes[id].click {
            ClickBehavior::Accept | ClickBehavior::InterceptNative => {
                Self::record_click(&mut state, id);
                Ok(())
            }
            ClickBehavior::FailAlways => Err(AlumnusError::driver("script click failed")),
            ClickBehavior::Stale => Err(AlumnusError::StaleElement {
                id: element.id.clone(),
            }),
        }
    }

    async fn clear(&self, element: &ElementHandle) -> AlumnusResult<()> {
        let mut state = self.state();
        state.call_history.push(format!("clear:{}", element.id));
        let id = Self::resolve_id(&state, element)?;
        state.page.nodes[id].content.clear();
        Ok(())
    }

    async fn type_text(&self, element: &ElementHandle, text: &str) -> AlumnusResult<()> {
        let mut state = self.state();
        let id = Self::resolve_id(&state, element)?;
        if !state.page.nodes[id].editable {
            return Err(AlumnusError::driver(format!(
                "element {} is not editable",
                element.id
            )));
        }
        state.page.nodes[id].content.push_str(text);
        Self::record_input(&mut state, id);
        Ok(())
    }

    async fn press_key(&self, element: &ElementHandle, key: Key) -> AlumnusResult<()> {
        let mut state = self.state();
        state
            .call_history
            .push(format!("key:{}:{:?}", element.id, key));
        let id = Self::resolve_id(&state, element)?;
        match key {
            Key::Backspace => {
                let _ = state.page.nodes[id].content.pop();
            }
            Key::LineBreak => state.page.nodes[id].content.push('\n'),
        }
        Self::record_input(&mut state, id);
        Ok(())
    }

    async fn screenshot(&self) -> AlumnusResult<Vec<u8>> {
        let mut state = self.state();
        state.call_history.push("screenshot".to_string());
        if !state.alive {
            return Err(AlumnusError::ScreenshotError {
                message: "browser closed".to_string(),
            });
        }
        Ok(b"\x89PNG\r\n\x1a\nmock".to_vec())
    }

    async fn is_alive(&self) -> bool {
        self.state().alive
    }

    async fn close(&self) -> AlumnusResult<()> {
        let mut state = self.state();
        state.call_history.push("close".to_string());
        state.alive = false;
        Ok(())
    }
}
