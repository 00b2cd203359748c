//! Light/dark preference shared between the durable store and the document root.
//!
//! The store is the source of truth: whenever the root disagrees with it (a
//! server patch can re-render the root with its own default), the stored value
//! is re-applied. Toggling reads the root instead of the store so a click made
//! while a patch is in flight flips what the user actually sees.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use serde::{Deserialize, Serialize};

use crate::config::{ThemeConfig, ToggleClasses};
use crate::error::Result;
use crate::teardown::Teardown;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    #[default]
    Dark,
}

impl Theme {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Dark => "dark",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "light" => Some(Self::Light),
            "dark" => Some(Self::Dark),
            _ => None,
        }
    }

    pub fn flipped(self) -> Self {
        match self {
            Self::Light => Self::Dark,
            Self::Dark => Self::Light,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Light => "Light",
            Self::Dark => "Dark",
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Origin-scoped key/value storage that survives reloads.
pub trait DurableStore {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
}

/// The document root element the styling rules key off.
pub trait ThemeRoot {
    fn current_theme(&self) -> Theme;
    fn apply_theme(&self, theme: Theme) -> Result<()>;
    /// Forces a synchronous style recalculation.
    fn force_restyle(&self);
}

pub trait ThemeToggleView {
    fn render(&self, appearance: &ToggleAppearance);
    fn on_click(&self, handler: Box<dyn FnMut()>) -> Teardown;
}

pub trait ThemeDom {
    /// The toggle affordance, when the current page renders one.
    fn find_toggle(&self) -> Option<Rc<dyn ThemeToggleView>>;
}

/// Visual state of the toggle switch for one theme.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToggleAppearance {
    pub theme: Theme,
    pub knob_add: String,
    pub knob_remove: String,
    pub track_add: String,
    pub track_remove: String,
    pub label: &'static str,
}

impl ToggleAppearance {
    pub fn for_theme(theme: Theme, classes: &ToggleClasses) -> Self {
        let (knob_add, knob_remove, track_add, track_remove) = match theme {
            Theme::Light => (
                &classes.knob_light,
                &classes.knob_dark,
                &classes.track_light,
                &classes.track_dark,
            ),
            Theme::Dark => (
                &classes.knob_dark,
                &classes.knob_light,
                &classes.track_dark,
                &classes.track_light,
            ),
        };
        Self {
            theme,
            knob_add: knob_add.clone(),
            knob_remove: knob_remove.clone(),
            track_add: track_add.clone(),
            track_remove: track_remove.clone(),
            label: theme.label(),
        }
    }
}

#[derive(Clone)]
pub struct ThemeController {
    inner: Rc<ThemeInner>,
}

struct ThemeInner {
    config: ThemeConfig,
    store: Rc<dyn DurableStore>,
    root: Rc<dyn ThemeRoot>,
    dom: Rc<dyn ThemeDom>,
    toggle: RefCell<Option<Rc<dyn ThemeToggleView>>>,
}

impl ThemeController {
    pub fn new(
        config: ThemeConfig,
        store: Rc<dyn DurableStore>,
        root: Rc<dyn ThemeRoot>,
        dom: Rc<dyn ThemeDom>,
    ) -> Self {
        Self {
            inner: Rc::new(ThemeInner {
                config,
                store,
                root,
                dom,
                toggle: RefCell::new(None),
            }),
        }
    }

    /// Theme currently shown by the document root.
    pub fn current(&self) -> Theme {
        self.inner.root.current_theme()
    }

    /// Persisted preference, falling back to the configured default when the
    /// store is empty, unreadable or holds an unknown value.
    pub fn stored(&self) -> Theme {
        let key = &self.inner.config.storage_key;
        match self.inner.store.get(key) {
            Ok(Some(raw)) => Theme::parse(&raw).unwrap_or_else(|| {
                log::warn!("ignoring unknown stored theme {raw:?}");
                self.inner.config.default
            }),
            Ok(None) => self.inner.config.default,
            Err(error) => {
                log::warn!("theme preference unreadable, using default: {error}");
                self.inner.config.default
            }
        }
    }

    /// Re-applies the stored preference if the root drifted from it.
    ///
    /// Returns whether anything changed.
    pub fn ensure_consistency(&self) -> Result<bool> {
        let stored = self.stored();
        if self.current() == stored {
            return Ok(false);
        }
        log::debug!("theme root drifted to {}, restoring {stored}", self.current());
        self.set_theme(stored)?;
        Ok(true)
    }

    pub fn set_theme(&self, theme: Theme) -> Result<()> {
        self.inner.root.apply_theme(theme)?;
        let persisted = self
            .inner
            .store
            .set(&self.inner.config.storage_key, theme.as_str());
        self.inner.root.force_restyle();
        persisted
    }

    pub fn toggle(&self) -> Result<Theme> {
        let next = self.current().flipped();
        self.set_theme(next)?;
        self.render_toggle(next);
        Ok(next)
    }

    pub fn has_toggle(&self) -> bool {
        self.inner.toggle.borrow().is_some()
    }

    /// Brings the root in line with the store and binds the toggle affordance
    /// if the page has one.
    pub fn attach(&self) -> Teardown {
        if let Err(error) = self.ensure_consistency() {
            log::warn!("failed to restore theme preference: {error}");
        }

        let Some(view) = self.inner.dom.find_toggle() else {
            self.inner.toggle.borrow_mut().take();
            return Teardown::noop();
        };

        view.render(&ToggleAppearance::for_theme(
            self.current(),
            &self.inner.config.toggle_classes,
        ));
        let controller = self.clone();
        let click = view.on_click(Box::new(move || {
            if let Err(error) = controller.toggle() {
                log::warn!("theme toggle failed: {error}");
            }
        }));
        *self.inner.toggle.borrow_mut() = Some(view);

        let inner: Weak<ThemeInner> = Rc::downgrade(&self.inner);
        Teardown::new(move || {
            click.run();
            if let Some(inner) = inner.upgrade() {
                inner.toggle.borrow_mut().take();
            }
        })
    }

    fn render_toggle(&self, theme: Theme) {
        let view = self.inner.toggle.borrow().clone();
        if let Some(view) = view {
            view.render(&ToggleAppearance::for_theme(
                theme,
                &self.inner.config.toggle_classes,
            ));
        }
    }
}
