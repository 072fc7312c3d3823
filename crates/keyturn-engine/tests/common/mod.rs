//! Scripted in-memory browser used by the engine integration tests.
//!
//! Pages, frames, and elements are declared up front; submitting an
//! element applies its scripted transition (URL/title change, new window,
//! validation text reveal). Every session call is appended to an event
//! log so tests can assert on what the engine actually did.

// Not every test binary exercises every helper here.
#![allow(dead_code)]

use async_trait::async_trait;
use keyturn_common::{Locator, SessionError};
use keyturn_engine::session::{ENTER_KEY, READY_STATE_SCRIPT, ScriptArg, Session};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

fn fresh_id() -> u64 {
    NEXT_ID.fetch_add(1, Ordering::SeqCst)
}

/// Page mutation applied when an element is activated (clicked, script
/// clicked, or Enter-submitted).
#[derive(Debug, Clone, Default)]
pub struct Transition {
    pub url: Option<String>,
    pub title: Option<String>,
    /// Open a new window with (url, title); the original window keeps its
    /// state and stays current until someone switches.
    pub open_window: Option<(String, String)>,
    /// Selector keys of elements to make visible (validation messages).
    pub reveal: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct MockElement {
    pub id: u64,
    pub selectors: Vec<String>,
    pub visible: bool,
    pub clickable: bool,
    pub text: String,
    pub value: String,
    pub intercept_clicks: bool,
    pub transition: Option<Transition>,
}

impl MockElement {
    pub fn field(selector: &str) -> Self {
        Self {
            id: fresh_id(),
            selectors: vec![selector.to_string()],
            visible: true,
            clickable: true,
            text: String::new(),
            value: String::new(),
            intercept_clicks: false,
            transition: None,
        }
    }

    pub fn button(selector: &str, transition: Transition) -> Self {
        Self {
            transition: Some(transition),
            ..Self::field(selector)
        }
    }

    pub fn validation(selector: &str, text: &str) -> Self {
        Self {
            text: text.to_string(),
            visible: false,
            ..Self::field(selector)
        }
    }

    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    pub fn visible(mut self) -> Self {
        self.visible = true;
        self
    }

    pub fn intercepted(mut self) -> Self {
        self.intercept_clicks = true;
        self
    }

    pub fn unclickable(mut self) -> Self {
        self.clickable = false;
        self
    }

    pub fn with_transition(mut self, transition: Transition) -> Self {
        self.transition = Some(transition);
        self
    }

    fn matches(&self, locator: &Locator) -> bool {
        locator
            .alternatives()
            .iter()
            .any(|alt| self.selectors.iter().any(|s| s == alt))
    }
}

#[derive(Debug, Clone, Default)]
pub struct MockFrame {
    pub elements: Vec<MockElement>,
    pub children: Vec<MockFrame>,
    /// Switching into a poisoned frame errors (detached mid-navigation).
    pub poisoned: bool,
}

impl MockFrame {
    pub fn with_elements(elements: Vec<MockElement>) -> Self {
        Self {
            elements,
            ..Self::default()
        }
    }

    pub fn poisoned() -> Self {
        Self {
            poisoned: true,
            ..Self::default()
        }
    }

    pub fn with_children(mut self, children: Vec<MockFrame>) -> Self {
        self.children = children;
        self
    }

    fn find_by_id(&mut self, id: u64) -> Option<&mut MockElement> {
        if let Some(e) = self.elements.iter_mut().find(|e| e.id == id) {
            return Some(e);
        }
        for child in &mut self.children {
            if let Some(e) = child.find_by_id(id) {
                return Some(e);
            }
        }
        None
    }

    fn reveal(&mut self, keys: &[String]) {
        for element in &mut self.elements {
            if element.selectors.iter().any(|s| keys.contains(s)) {
                element.visible = true;
            }
        }
        for child in &mut self.children {
            child.reveal(keys);
        }
    }
}

#[derive(Debug, Clone)]
pub struct MockWindow {
    pub handle: String,
    pub url: String,
    pub title: String,
    pub ready_state: String,
    pub document: MockFrame,
}

/// A navigable page declaration for `MockBrowser::navigate`.
#[derive(Debug, Clone)]
pub struct PageSpec {
    /// URL the browser ends up on (allows scripted redirects).
    pub final_url: String,
    pub title: String,
    pub document: MockFrame,
    /// When false the document reports `loading` forever.
    pub ready: bool,
}

impl PageSpec {
    pub fn new(final_url: &str, title: &str, document: MockFrame) -> Self {
        Self {
            final_url: final_url.to_string(),
            title: title.to_string(),
            document,
            ready: true,
        }
    }

    pub fn never_ready(mut self) -> Self {
        self.ready = false;
        self
    }
}

pub struct MockBrowser {
    pub windows: Vec<MockWindow>,
    pub pages: HashMap<String, PageSpec>,
    pub current: usize,
    pub frame_path: Vec<u16>,
    pub log: Vec<String>,
    pub submissions: u32,
    pub closes: u32,
}

impl MockBrowser {
    pub fn new() -> Self {
        Self {
            windows: vec![MockWindow {
                handle: "w0".to_string(),
                url: "about:blank".to_string(),
                title: String::new(),
                ready_state: "complete".to_string(),
                document: MockFrame::default(),
            }],
            pages: HashMap::new(),
            current: 0,
            frame_path: Vec::new(),
            log: Vec::new(),
            submissions: 0,
            closes: 0,
        }
    }

    pub fn page(mut self, url: &str, spec: PageSpec) -> Self {
        self.pages.insert(url.to_string(), spec);
        self
    }

    pub fn event_count(&self, prefix: &str) -> usize {
        self.log.iter().filter(|e| e.starts_with(prefix)).count()
    }

    pub fn element_value(&mut self, id: u64) -> String {
        self.element_mut(id).map(|e| e.value.clone()).unwrap_or_default()
    }

    fn window_mut(&mut self) -> &mut MockWindow {
        &mut self.windows[self.current]
    }

    fn active_frame_mut(&mut self) -> Result<&mut MockFrame, SessionError> {
        let path = self.frame_path.clone();
        let mut frame = &mut self.windows[self.current].document;
        for index in path {
            frame = frame
                .children
                .get_mut(index as usize)
                .ok_or_else(|| SessionError::Detached(format!("frame {index}")))?;
        }
        Ok(frame)
    }

    fn element_mut(&mut self, id: u64) -> Result<&mut MockElement, SessionError> {
        for window in &mut self.windows {
            if let Some(e) = window.document.find_by_id(id) {
                return Ok(e);
            }
        }
        Err(SessionError::Detached(format!("element {id}")))
    }

    /// Fire an element's scripted transition. This is the single "net
    /// submission" the tests count.
    fn activate(&mut self, id: u64) -> Result<(), SessionError> {
        let transition = self.element_mut(id)?.transition.clone();
        let Some(transition) = transition else {
            return Ok(());
        };
        self.submissions += 1;
        if let Some(url) = transition.url {
            self.window_mut().url = url;
        }
        if let Some(title) = transition.title {
            self.window_mut().title = title;
        }
        if !transition.reveal.is_empty() {
            let keys = transition.reveal.clone();
            self.window_mut().document.reveal(&keys);
        }
        if let Some((url, title)) = transition.open_window {
            let handle = format!("w{}", self.windows.len());
            self.windows.push(MockWindow {
                handle,
                url,
                title,
                ready_state: "complete".to_string(),
                document: MockFrame::default(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl Session for MockBrowser {
    type Element = u64;
    type Window = String;

    async fn navigate(&mut self, url: &str) -> Result<(), SessionError> {
        self.log.push(format!("navigate:{url}"));
        let spec = self
            .pages
            .get(url)
            .cloned()
            .ok_or_else(|| SessionError::Backend(format!("no scripted page for {url}")))?;
        self.frame_path.clear();
        let window = self.window_mut();
        window.url = spec.final_url;
        window.title = spec.title;
        window.ready_state = if spec.ready { "complete" } else { "loading" }.to_string();
        window.document = spec.document;
        Ok(())
    }

    async fn current_url(&mut self) -> Result<String, SessionError> {
        Ok(self.windows[self.current].url.clone())
    }

    async fn title(&mut self) -> Result<String, SessionError> {
        Ok(self.windows[self.current].title.clone())
    }

    async fn find_elements(&mut self, locator: &Locator) -> Result<Vec<u64>, SessionError> {
        // Frame enumeration is modeled structurally, not as stored tags.
        if locator
            .alternatives()
            .iter()
            .any(|alt| alt == "iframe" || alt == "frame")
        {
            let count = self.active_frame_mut()?.children.len();
            return Ok((0..count).map(|_| fresh_id()).collect());
        }
        let frame = self.active_frame_mut()?;
        Ok(frame
            .elements
            .iter()
            .filter(|e| e.matches(locator))
            .map(|e| e.id)
            .collect())
    }

    async fn is_visible(&mut self, element: &u64) -> Result<bool, SessionError> {
        Ok(self.element_mut(*element)?.visible)
    }

    async fn is_clickable(&mut self, element: &u64) -> Result<bool, SessionError> {
        let e = self.element_mut(*element)?;
        Ok(e.visible && e.clickable)
    }

    async fn clear(&mut self, element: &u64) -> Result<(), SessionError> {
        self.log.push("clear".to_string());
        self.element_mut(*element)?.value.clear();
        Ok(())
    }

    async fn send_keys(&mut self, element: &u64, text: &str) -> Result<(), SessionError> {
        if text == ENTER_KEY {
            self.log.push("enter_submit".to_string());
            return self.activate(*element);
        }
        self.element_mut(*element)?.value.push_str(text);
        Ok(())
    }

    async fn click(&mut self, element: &u64) -> Result<(), SessionError> {
        let intercepts = self.element_mut(*element)?.intercept_clicks;
        if intercepts {
            self.log.push("click_intercepted".to_string());
            return Err(SessionError::Intercepted("overlay".to_string()));
        }
        self.log.push("click".to_string());
        self.activate(*element)
    }

    async fn text(&mut self, element: &u64) -> Result<String, SessionError> {
        Ok(self.element_mut(*element)?.text.clone())
    }

    async fn switch_to_frame(&mut self, index: u16) -> Result<(), SessionError> {
        self.log.push(format!("switch_frame:{index}"));
        let frame = self.active_frame_mut()?;
        let child = frame
            .children
            .get(index as usize)
            .ok_or_else(|| SessionError::Detached(format!("no frame {index}")))?;
        if child.poisoned {
            return Err(SessionError::Detached(format!("frame {index} detached")));
        }
        self.frame_path.push(index);
        Ok(())
    }

    async fn switch_to_default(&mut self) -> Result<(), SessionError> {
        self.log.push("switch_default".to_string());
        self.frame_path.clear();
        Ok(())
    }

    async fn window_handles(&mut self) -> Result<Vec<String>, SessionError> {
        Ok(self.windows.iter().map(|w| w.handle.clone()).collect())
    }

    async fn current_window(&mut self) -> Result<String, SessionError> {
        Ok(self.windows[self.current].handle.clone())
    }

    async fn switch_to_window(&mut self, window: &String) -> Result<(), SessionError> {
        self.log.push(format!("switch_window:{window}"));
        let index = self
            .windows
            .iter()
            .position(|w| &w.handle == window)
            .ok_or_else(|| SessionError::Backend(format!("no window {window}")))?;
        self.current = index;
        self.frame_path.clear();
        Ok(())
    }

    async fn execute_script(
        &mut self,
        script: &str,
        args: Vec<ScriptArg<u64>>,
    ) -> Result<serde_json::Value, SessionError> {
        if script == READY_STATE_SCRIPT {
            return Ok(serde_json::Value::String(
                self.windows[self.current].ready_state.clone(),
            ));
        }
        if script.contains("scrollIntoView") {
            return Ok(serde_json::Value::Null);
        }
        if script.contains("click()") {
            self.log.push("js_click".to_string());
            if let Some(ScriptArg::Element(id)) = args.into_iter().next() {
                self.activate(id)?;
            }
            return Ok(serde_json::Value::Null);
        }
        Err(SessionError::Script(format!("unscripted: {script}")))
    }

    async fn close(&mut self) -> Result<(), SessionError> {
        self.log.push("close".to_string());
        self.closes += 1;
        Ok(())
    }
}
