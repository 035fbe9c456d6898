//! Scripted host
//!
//! A scene is a YAML list of screens. The simulator shows one screen at a
//! time through an in-memory tree and answers activations from the element
//! table of that screen.
//!
//! ```yaml
//! package: com.example.shop
//! lookup_latency_ms: { "Pay Now": 120 }
//! screens:
//!   - name: product
//!     elements:
//!       - id: buy
//!         text: Buy Now
//!         view_id: com.example.shop:id/buy_now
//!       - id: cart
//!         text: Add to Cart
//!         responds: false
//!   - name: loading
//!     no_window: true
//! ```

use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use action_locator::{ElementRef, StaticElement, StaticTree, UiTree};
use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use rapidtap_core_types::{Bounds, TapError, UiEvent, UiEventKind};
use rapidtap_scheduler::HostPort;
use serde::Deserialize;
use tool_click::{ActuatorPort, GestureAck, TapGesture};
use tracing::debug;

use crate::errors::AppError;

#[derive(Clone, Debug, Deserialize)]
pub struct Scene {
    /// Package the simulated window belongs to; defaults to the tracked one.
    #[serde(default)]
    pub package: Option<String>,
    #[serde(default)]
    pub gesture: GestureMode,
    /// Artificial delay per lookup query.
    #[serde(default)]
    pub lookup_latency_ms: BTreeMap<String, u64>,
    /// Lookup queries that fail.
    #[serde(default)]
    pub lookup_faults: Vec<String>,
    pub screens: Vec<ScreenSpec>,
}

#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum GestureMode {
    #[default]
    Completed,
    Cancelled,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ScreenSpec {
    pub name: String,
    #[serde(default)]
    pub no_window: bool,
    #[serde(default)]
    pub elements: Vec<ElementSpec>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ElementSpec {
    pub id: String,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub view_id: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub bounds: Option<Bounds>,
    #[serde(default = "enabled")]
    pub clickable: bool,
    #[serde(default = "enabled")]
    pub enabled: bool,
    #[serde(default = "enabled")]
    pub visible: bool,
    /// Bounds can no longer be read.
    #[serde(default)]
    pub stale: bool,
    /// Whether activation reports success.
    #[serde(default = "enabled")]
    pub responds: bool,
    #[serde(default)]
    pub activation_latency_ms: u64,
}

fn enabled() -> bool {
    true
}

impl Scene {
    pub fn from_yaml(raw: &str) -> Result<Self, AppError> {
        let scene: Scene =
            serde_yaml::from_str(raw).map_err(|err| AppError::Scene(err.to_string()))?;
        if scene.screens.is_empty() {
            return Err(AppError::Scene("scene has no screens".into()));
        }
        Ok(scene)
    }

    pub fn load(path: &Path) -> Result<Self, AppError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_yaml(&raw)
    }
}

impl ElementSpec {
    fn to_static(&self) -> StaticElement {
        let mut element = StaticElement::new(self.id.clone())
            .with_clickable(self.clickable)
            .with_enabled(self.enabled)
            .with_visible(self.visible);
        if let Some(text) = &self.text {
            element = element.with_text(text.clone());
        }
        if let Some(view_id) = &self.view_id {
            element = element.with_view_id(view_id.clone());
        }
        if let Some(description) = &self.description {
            element = element.with_description(description.clone());
        }
        if let Some(bounds) = self.bounds {
            element = element.with_bounds(bounds);
        }
        if self.stale {
            element = element.stale();
        }
        element
    }

    fn key(&self) -> Option<String> {
        self.text
            .clone()
            .or_else(|| self.view_id.clone())
            .or_else(|| self.description.clone())
    }
}

/// How the simulated screen reacts to one element.
#[derive(Clone, Copy, Debug)]
struct Reaction {
    responds: bool,
    latency: Duration,
}

/// One interaction observed by the simulated actuator.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TapRecord {
    Activated { element: String, accepted: bool },
    Gesture { x: i32, y: i32 },
}

pub struct SimulatedActuator {
    reactions: RwLock<HashMap<String, Reaction>>,
    gesture: GestureMode,
    log: Mutex<Vec<TapRecord>>,
}

impl SimulatedActuator {
    fn new(gesture: GestureMode) -> Self {
        Self {
            reactions: RwLock::new(HashMap::new()),
            gesture,
            log: Mutex::new(Vec::new()),
        }
    }

    fn load_screen(&self, screen: &ScreenSpec) {
        let reactions = screen
            .elements
            .iter()
            .filter_map(|element| {
                element.key().map(|key| {
                    (
                        key,
                        Reaction {
                            responds: element.responds,
                            latency: Duration::from_millis(element.activation_latency_ms),
                        },
                    )
                })
            })
            .collect();
        *self.reactions.write() = reactions;
    }

    pub fn records(&self) -> Vec<TapRecord> {
        self.log.lock().clone()
    }

    /// Elements whose activation was accepted, in order.
    pub fn accepted(&self) -> Vec<String> {
        self.log
            .lock()
            .iter()
            .filter_map(|record| match record {
                TapRecord::Activated {
                    element,
                    accepted: true,
                } => Some(element.clone()),
                _ => None,
            })
            .collect()
    }
}

fn element_key(element: &ElementRef) -> Option<String> {
    element
        .text()
        .or_else(|| element.view_id())
        .or_else(|| element.description())
}

#[async_trait]
impl ActuatorPort for SimulatedActuator {
    async fn activate(&self, element: &ElementRef) -> Result<bool, TapError> {
        let key = element_key(element)
            .ok_or_else(|| TapError::new("element has no text, identifier or description"))?;
        // copy out so no lock is held across the sleep
        let reaction = self.reactions.read().get(&key).copied();
        let Some(reaction) = reaction else {
            return Err(TapError::new(format!("'{key}' is not on screen")));
        };
        if !reaction.latency.is_zero() {
            tokio::time::sleep(reaction.latency).await;
        }
        self.log.lock().push(TapRecord::Activated {
            element: key,
            accepted: reaction.responds,
        });
        Ok(reaction.responds)
    }

    async fn dispatch_gesture(&self, gesture: TapGesture) -> Result<GestureAck, TapError> {
        self.log.lock().push(TapRecord::Gesture {
            x: gesture.x,
            y: gesture.y,
        });
        Ok(match self.gesture {
            GestureMode::Completed => GestureAck::Completed,
            GestureMode::Cancelled => GestureAck::Cancelled,
        })
    }
}

pub struct SimulatedHost {
    package: String,
    screens: Vec<ScreenSpec>,
    current: RwLock<usize>,
    tree: Arc<StaticTree>,
    actuator: Arc<SimulatedActuator>,
}

impl SimulatedHost {
    /// `tracked_package` is used when the scene does not name its own.
    pub fn new(scene: Scene, tracked_package: &str) -> Self {
        let mut tree = StaticTree::new(Vec::new());
        for (query, latency_ms) in &scene.lookup_latency_ms {
            tree = tree.with_latency(query.clone(), Duration::from_millis(*latency_ms));
        }
        for query in &scene.lookup_faults {
            tree = tree.with_fault(query.clone());
        }
        let host = Self {
            package: scene
                .package
                .unwrap_or_else(|| tracked_package.to_string()),
            actuator: Arc::new(SimulatedActuator::new(scene.gesture)),
            screens: scene.screens,
            current: RwLock::new(0),
            tree: Arc::new(tree),
        };
        host.show(0);
        host
    }

    pub fn package(&self) -> &str {
        &self.package
    }

    pub fn screen_count(&self) -> usize {
        self.screens.len()
    }

    /// Switches to screen `index`, wrapping around, and returns its name.
    pub fn show(&self, index: usize) -> &str {
        let index = index % self.screens.len().max(1);
        let Some(screen) = self.screens.get(index) else {
            return "";
        };
        self.tree
            .replace_elements(screen.elements.iter().map(ElementSpec::to_static).collect());
        self.actuator.load_screen(screen);
        *self.current.write() = index;
        debug!(screen = %screen.name, elements = screen.elements.len(), "screen shown");
        &screen.name
    }

    /// A content-change signal from the simulated window.
    pub fn event(&self) -> UiEvent {
        UiEvent::new(self.package.clone(), UiEventKind::ContentChanged)
    }

    pub fn tree(&self) -> &Arc<StaticTree> {
        &self.tree
    }

    pub fn actuator(&self) -> &Arc<SimulatedActuator> {
        &self.actuator
    }
}

#[async_trait]
impl HostPort for SimulatedHost {
    async fn active_root(&self) -> Result<Option<Arc<dyn UiTree>>, TapError> {
        let index = *self.current.read();
        match self.screens.get(index) {
            Some(screen) if screen.no_window => Ok(None),
            Some(_) => Ok(Some(self.tree.clone() as Arc<dyn UiTree>)),
            None => Err(TapError::new("no screen loaded")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCENE: &str = r#"
screens:
  - name: product
    elements:
      - id: buy
        text: Buy Now
        bounds: { left: 10, top: 10, right: 210, bottom: 90 }
      - id: cart
        view_id: shop:id/cart
        responds: false
  - name: loading
    no_window: true
"#;

    #[test]
    fn scene_defaults_are_applied() {
        let scene = Scene::from_yaml(SCENE).unwrap();
        assert_eq!(scene.gesture, GestureMode::Completed);
        assert_eq!(scene.screens.len(), 2);
        let cart = &scene.screens[0].elements[1];
        assert!(cart.clickable && cart.visible && cart.enabled);
        assert!(!cart.responds);
        assert_eq!(
            scene.screens[0].elements[0].bounds,
            Some(Bounds::new(10, 10, 210, 90))
        );
    }

    #[test]
    fn empty_scene_is_rejected() {
        assert!(matches!(
            Scene::from_yaml("screens: []"),
            Err(AppError::Scene(_))
        ));
    }

    #[tokio::test]
    async fn screens_switch_tree_and_window() {
        let host = SimulatedHost::new(Scene::from_yaml(SCENE).unwrap(), "com.example.shop");
        assert_eq!(host.package(), "com.example.shop");
        let root = host.active_root().await.unwrap().expect("window");
        assert_eq!(root.find_by_text("Buy Now").await.unwrap().len(), 1);

        assert_eq!(host.show(1), "loading");
        assert!(host.active_root().await.unwrap().is_none());
        assert_eq!(host.show(2), "product");
    }

    #[tokio::test]
    async fn actuator_follows_the_current_screen() {
        let host = SimulatedHost::new(Scene::from_yaml(SCENE).unwrap(), "com.example.shop");
        let buy = host.tree().find_by_text("Buy Now").await.unwrap().remove(0);
        let cart = host
            .tree()
            .find_by_view_id("shop:id/cart")
            .await
            .unwrap()
            .remove(0);
        let actuator = host.actuator().clone();
        assert!(actuator.activate(&buy).await.unwrap());
        assert!(!actuator.activate(&cart).await.unwrap());
        assert_eq!(actuator.accepted(), vec!["Buy Now".to_string()]);

        host.show(1);
        assert!(actuator.activate(&buy).await.is_err());
    }
}
