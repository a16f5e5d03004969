//! Map Host: creates the map surface, keeps it sized, and destroys it on unmount.
//!
//! Mounting is asynchronous: the center may come from a geocoder, and the map
//! library and its plugins load lazily. Every await is followed by a
//! cancellation check so an unmounted page never writes to a destroyed map.

use std::cell::Cell;
use std::rc::Rc;

use siteplan_shared::models::GeoPoint;

use crate::config::EditorConfig;
use crate::error::EditorError;
use crate::notice::Notice;
use crate::surface::{Capabilities, MapSurface};

/// Set on unmount; checked after every await of an in-flight mount.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Rc<Cell<bool>>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.set(true);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.get()
    }

    fn check(&self) -> Result<(), EditorError> {
        if self.is_cancelled() {
            Err(EditorError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Resolves a postcode to a map center.
#[allow(async_fn_in_trait)]
pub trait Geocoder {
    async fn locate(&self, postcode: &str) -> Result<GeoPoint, String>;
}

/// Geocoder for pages that never look up postcodes.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoGeocoder;

impl Geocoder for NoGeocoder {
    async fn locate(&self, postcode: &str) -> Result<GeoPoint, String> {
        Err(format!("no geocoder configured for {postcode}"))
    }
}

#[allow(async_fn_in_trait)]
pub trait SurfaceFactory {
    type Surface: MapSurface;

    async fn create(&self, center: GeoPoint, zoom: f64) -> Result<Self::Surface, String>;
}

/// Loads optional map plugins (distortable images, draw tools).
#[allow(async_fn_in_trait)]
pub trait CapabilityLoader {
    async fn load(&self) -> Result<Capabilities, String>;
}

/// A registered window-resize handler.
pub trait ResizeListener {
    fn remove(&mut self);
}

#[derive(Debug)]
pub struct MountedMap<S> {
    pub surface: S,
    pub capabilities: Capabilities,
    pub center: GeoPoint,
    pub notices: Vec<Notice>,
}

/// Create the map surface centered on `postcode` (or the fallback center).
///
/// Geocoding failures fall back to the configured center and plugin failures
/// degrade to a read-only map; only surface creation itself can fail.
pub async fn mount<G, F, C>(
    geocoder: &G,
    factory: &F,
    loader: &C,
    postcode: Option<&str>,
    config: &EditorConfig,
    cancel: &CancelToken,
) -> Result<MountedMap<F::Surface>, EditorError>
where
    G: Geocoder,
    F: SurfaceFactory,
    C: CapabilityLoader,
{
    let mut notices = Vec::new();

    let postcode = postcode.map(str::trim).filter(|p| !p.is_empty());
    let center = match postcode {
        Some(postcode) => {
            let located = geocoder.locate(postcode).await;
            cancel.check()?;
            match located.and_then(|c| {
                if c.is_finite() {
                    Ok(c)
                } else {
                    Err("invalid coordinates".to_string())
                }
            }) {
                Ok(center) => center,
                Err(reason) => {
                    tracing::warn!(postcode, %reason, "Geocoding failed, using fallback center");
                    notices.push(Notice::warning(format!(
                        "Could not locate {postcode}, showing the default location"
                    )));
                    config.fallback_center
                }
            }
        }
        None => config.fallback_center,
    };
    let zoom = config.clamp_zoom(config.default_zoom);

    let created = factory.create(center, zoom).await;
    if cancel.is_cancelled() {
        if let Ok(mut surface) = created {
            surface.destroy();
        }
        return Err(EditorError::Cancelled);
    }
    let mut surface = created.map_err(|e| {
        tracing::error!(error = %e, "Map surface creation failed");
        EditorError::Initialization(e)
    })?;

    let loaded = loader.load().await;
    if cancel.is_cancelled() {
        surface.destroy();
        return Err(EditorError::Cancelled);
    }
    let capabilities = match loaded {
        Ok(capabilities) => capabilities,
        Err(e) => {
            tracing::warn!(error = %e, "Map plugins failed to load, degrading to read-only map");
            Capabilities::none()
        }
    };
    if capabilities.is_degraded() {
        notices.push(Notice::warning(
            "Some editing tools are unavailable, the map is partly read-only",
        ));
    }

    tracing::info!(
        lat = center.latitude,
        lng = center.longitude,
        zoom,
        ?capabilities,
        "Map surface ready"
    );
    Ok(MountedMap {
        surface,
        capabilities,
        center,
        notices,
    })
}

/// Owns the surface once mounted, plus the resize listener keeping it sized.
pub struct MapHost<S> {
    surface: Option<S>,
    capabilities: Capabilities,
    resize: Option<Box<dyn ResizeListener>>,
}

impl<S: MapSurface> Default for MapHost<S> {
    fn default() -> Self {
        Self {
            surface: None,
            capabilities: Capabilities::none(),
            resize: None,
        }
    }
}

impl<S: MapSurface> MapHost<S> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attach(&mut self, surface: S, capabilities: Capabilities) {
        self.surface = Some(surface);
        self.capabilities = capabilities;
    }

    pub fn set_resize_listener(&mut self, listener: Box<dyn ResizeListener>) {
        if let Some(mut previous) = self.resize.replace(listener) {
            previous.remove();
        }
    }

    pub fn is_ready(&self) -> bool {
        self.surface.is_some()
    }

    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    pub fn surface(&self) -> Option<&S> {
        self.surface.as_ref()
    }

    pub fn surface_mut(&mut self) -> Result<&mut S, EditorError> {
        self.surface.as_mut().ok_or(EditorError::NotReady)
    }

    pub fn handle_resize(&mut self, width: f64, height: f64) {
        if let Some(surface) = self.surface.as_mut() {
            surface.invalidate_size(width, height);
        }
    }

    /// Remove the resize listener and destroy the surface.
    pub fn teardown(&mut self) {
        if let Some(mut listener) = self.resize.take() {
            listener.remove();
        }
        if let Some(mut surface) = self.surface.take() {
            surface.destroy();
            tracing::info!("Map surface destroyed");
        }
    }
}
