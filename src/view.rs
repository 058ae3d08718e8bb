//! Views and scenes.

use crate::context::Context;
use crate::element::Element;
use crate::events::Handler;
use crate::router::Handlers;
use perch_core::{
    flatten_with, BuildError, EventKind, FlatTree, Hotkey, MenuItem, NodeId, SceneConfig,
    WindowConfig,
};

/// The root of a user interface.
///
/// `body` is called on every render and should be a cheap, pure function of application state;
/// anything an event handler changes becomes visible once it calls
/// [`Context::request_render`].
pub trait View: Send + 'static {
    /// Describes the current UI.
    fn body(&self) -> Element;

    /// Window, menu and hotkey configuration. Re-read on every render.
    fn scene(&self) -> Scene {
        Scene::default()
    }
}

impl<F> View for F
where
    F: Fn() -> Element + Send + 'static,
{
    fn body(&self) -> Element {
        self()
    }
}

/// Window, menu bar and global hotkeys, with their handlers.
#[derive(Debug, Default)]
pub struct Scene {
    window: WindowConfig,
    menu: Vec<Menu>,
    hotkeys: Vec<(Hotkey, Handler)>,
}

impl Scene {
    pub fn new() -> Scene {
        Scene::default()
    }

    pub fn title(mut self, title: impl Into<String>) -> Scene {
        self.window.title = title.into();
        self
    }

    pub fn size(mut self, width: u32, height: u32) -> Scene {
        self.window.width = width;
        self.window.height = height;
        self
    }

    pub fn resizable(mut self, resizable: bool) -> Scene {
        self.window.resizable = resizable;
        self
    }

    /// Appends a top-level menu.
    pub fn menu(mut self, menu: Menu) -> Scene {
        self.menu.push(menu);
        self
    }

    /// Registers a global key combination such as `cmd+shift+k`.
    pub fn hotkey<F: 'static + FnMut(&Context) + Send>(
        mut self,
        id: impl Into<NodeId>,
        keys: impl Into<String>,
        f: F,
    ) -> Scene {
        let hotkey = Hotkey {
            id: id.into(),
            keys: keys.into(),
        };
        self.hotkeys.push((hotkey, Handler::tap(f)));
        self
    }

    /// Splits the scene into its wire form and the handlers of its menu items and hotkeys.
    pub(crate) fn into_parts(self) -> (SceneConfig, Vec<(NodeId, Handler)>) {
        let mut handlers = Vec::new();
        let mut hotkeys = Vec::with_capacity(self.hotkeys.len());
        for (hotkey, handler) in self.hotkeys {
            handlers.push((hotkey.id.clone(), handler));
            hotkeys.push(hotkey);
        }

        let menu = self
            .menu
            .into_iter()
            .map(|menu| menu.into_item(&mut handlers))
            .collect();

        let config = SceneConfig {
            window: self.window,
            menu,
            hotkeys,
        };
        (config, handlers)
    }
}

/// A menu or menu entry.
#[derive(Debug)]
pub struct Menu {
    id: NodeId,
    title: String,
    shortcut: Option<String>,
    items: Vec<Menu>,
    handler: Option<Handler>,
}

impl Menu {
    pub fn new(id: impl Into<NodeId>, title: impl Into<String>) -> Menu {
        Menu {
            id: id.into(),
            title: title.into(),
            shortcut: None,
            items: Vec::new(),
            handler: None,
        }
    }

    pub fn shortcut(mut self, keys: impl Into<String>) -> Menu {
        self.shortcut = Some(keys.into());
        self
    }

    pub fn item(mut self, item: Menu) -> Menu {
        self.items.push(item);
        self
    }

    /// Called when the entry is chosen.
    pub fn on_select<F: 'static + FnMut(&Context) + Send>(mut self, f: F) -> Menu {
        self.handler = Some(Handler::tap(f));
        self
    }

    /// Converts a menu tree without recursing, collecting handlers as it goes.
    fn into_item(self, handlers: &mut Vec<(NodeId, Handler)>) -> MenuItem {
        let (mut root, items) = self.take(handlers);

        // entries in pre-order, each with the index of its parent entry (`None` for the root)
        let mut built: Vec<(MenuItem, Option<usize>)> = Vec::new();
        let mut stack: Vec<_> = items.into_iter().rev().map(|item| (item, None)).collect();
        while let Some((menu, parent)) = stack.pop() {
            let (item, items) = menu.take(handlers);
            let index = built.len();
            built.push((item, parent));
            stack.extend(items.into_iter().rev().map(|item| (item, Some(index))));
        }

        // back to front, every entry is complete before it moves into its parent
        while let Some((item, parent)) = built.pop() {
            match parent {
                Some(parent) => built[parent].0.items.insert(0, item),
                None => root.items.insert(0, item),
            }
        }
        root
    }

    fn take(self, handlers: &mut Vec<(NodeId, Handler)>) -> (MenuItem, Vec<Menu>) {
        if let Some(handler) = self.handler {
            handlers.push((self.id.clone(), handler));
        }
        let item = MenuItem {
            id: self.id,
            title: self.title,
            shortcut: self.shortcut,
            items: Vec::new(),
        };
        (item, self.items)
    }
}

/// The result of one build: what to send, and the handlers that belong to it.
pub(crate) struct Build {
    pub tree: FlatTree,
    pub scene: SceneConfig,
    pub handlers: Handlers,
}

/// Runs `body` and `scene`, assigns ids and collects every handler.
///
/// On failure nothing of the attempted build survives.
pub(crate) fn build(view: &dyn View, depth_limit: usize) -> Result<Build, BuildError> {
    let body = view.body();
    let mut handlers = Handlers::new();
    let tree = flatten_with(&body, depth_limit, |id, element: &Element| {
        for (kind, handler) in element.handlers() {
            handlers.add(id.clone(), *kind, handler.clone());
        }
    })?;

    let (scene, scene_handlers) = view.scene().into_parts();
    for (id, handler) in scene_handlers {
        handlers.add(id, EventKind::Tap, handler);
    }
    Ok(Build {
        tree,
        scene,
        handlers,
    })
}
