//! One editing session over one map: wires the host, overlay, shapes, form
//! and mode controller together and routes user input to them.

use std::collections::BTreeMap;

use siteplan_shared::interchange::FeatureCollection;
use siteplan_shared::models::{GeoPoint, ShapeKind, Vocabulary};

use crate::attributes::{AttributeWorkflow, PendingAttributeEdit};
use crate::commands::{CommandQueue, CommandSender, EditorCommand};
use crate::config::EditorConfig;
use crate::draw::{DraftStatus, DrawDraft, DrawEvent, DrawPalette, DrawnGeometry};
use crate::error::EditorError;
use crate::host::{CancelToken, MapHost, MountedMap, ResizeListener};
use crate::mode::{Affordance, EditorMode, ModeController};
use crate::notice::Notice;
use crate::overlay::{Overlay, OverlayManager, OverlayTicket, OverlayTransform};
use crate::store::{Clock, Shape, ShapeId, ShapeStore, SystemClock};
use crate::style::style_for;
use crate::surface::{Capabilities, LayerId, MapSurface, Popup, ShapeLayer};

/// Receives exported documents.
pub trait ExportSink {
    fn export(&mut self, document: &FeatureCollection) -> Result<(), EditorError>;
}

impl<F> ExportSink for F
where
    F: FnMut(&FeatureCollection) -> Result<(), EditorError>,
{
    fn export(&mut self, document: &FeatureCollection) -> Result<(), EditorError> {
        self(document)
    }
}

/// An image requested before the map was ready.
#[derive(Debug, Clone, PartialEq)]
struct QueuedImage {
    url: String,
    aspect: f64,
}

pub struct EditorSession<S: MapSurface> {
    config: EditorConfig,
    vocabulary: Vocabulary,
    host: MapHost<S>,
    cancel: CancelToken,
    overlays: OverlayManager,
    store: ShapeStore,
    form: AttributeWorkflow,
    mode: ModeController,
    draft: Option<DrawDraft>,
    layers: BTreeMap<ShapeId, LayerId>,
    commands: CommandQueue,
    notices: Vec<Notice>,
    clock: Box<dyn Clock>,
    queued_image: Option<QueuedImage>,
    queued_mode: Option<EditorMode>,
    ticket: Option<OverlayTicket>,
    /// Shape whose popup is open.
    popup: Option<ShapeId>,
    mount_failed: bool,
}

impl<S: MapSurface> EditorSession<S> {
    pub fn new(config: EditorConfig, vocabulary: Vocabulary) -> Self {
        Self::with_clock(config, vocabulary, Box::new(SystemClock))
    }

    pub fn with_clock(config: EditorConfig, vocabulary: Vocabulary, clock: Box<dyn Clock>) -> Self {
        let overlays = OverlayManager::new(config.overlay_span_px, config.overlay_editing_disabled);
        Self {
            config,
            vocabulary,
            host: MapHost::new(),
            cancel: CancelToken::new(),
            overlays,
            store: ShapeStore::new(),
            form: AttributeWorkflow::new(),
            mode: ModeController::new(DrawPalette::default()),
            draft: None,
            layers: BTreeMap::new(),
            commands: CommandQueue::default(),
            notices: Vec::new(),
            clock,
            queued_image: None,
            queued_mode: None,
            ticket: None,
            popup: None,
            mount_failed: false,
        }
    }

    // --- Accessors ---

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocabulary
    }

    /// Replace the vocabulary and restyle every shape.
    pub fn set_vocabulary(&mut self, vocabulary: Vocabulary) {
        self.vocabulary = vocabulary;
        let ids: Vec<ShapeId> = self.store.iter().map(|s| s.id).collect();
        for id in ids {
            if let Err(e) = self.sync_shape_layer(id) {
                tracing::warn!(shape_id = %id, error = %e, "Failed to restyle shape");
            }
        }
    }

    pub fn surface(&self) -> Option<&S> {
        self.host.surface()
    }

    pub fn surface_mut(&mut self) -> Option<&mut S> {
        self.host.surface_mut().ok()
    }

    pub fn is_ready(&self) -> bool {
        self.host.is_ready()
    }

    /// Surface creation failed; the page shows a non-interactive map.
    pub fn is_failed(&self) -> bool {
        self.mount_failed
    }

    /// Plugins available on the mounted map; none before mounting.
    pub fn capabilities(&self) -> Capabilities {
        self.host.capabilities()
    }

    pub fn mode(&self) -> EditorMode {
        self.queued_mode.unwrap_or(self.mode.mode())
    }

    pub fn palette(&self) -> &DrawPalette {
        self.mode.palette()
    }

    pub fn overlay(&self) -> Option<&Overlay> {
        self.overlays.overlay()
    }

    pub fn overlay_handles(&self) -> Option<[GeoPoint; 4]> {
        self.overlays.handles()
    }

    pub fn store(&self) -> &ShapeStore {
        &self.store
    }

    pub fn form(&self) -> Option<&PendingAttributeEdit> {
        self.form.pending()
    }

    pub fn sub_type_options(&self) -> &[String] {
        self.form.sub_type_options(&self.vocabulary)
    }

    pub fn sub_type_enabled(&self) -> bool {
        self.form.sub_type_enabled()
    }

    pub fn draft(&self) -> Option<&DrawDraft> {
        self.draft.as_ref()
    }

    pub fn command_sender(&self) -> CommandSender {
        self.commands.sender()
    }

    /// Token the mount future checks after every await.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn notices(&self) -> &[Notice] {
        &self.notices
    }

    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    /// Turn a recoverable error into a user notice.
    pub fn report(&mut self, err: &EditorError) {
        tracing::debug!(error = %err, "Reporting editor error");
        self.notify(Notice::warning(err.to_string()));
    }

    /// Queue a notice raised outside the editor, e.g. by a failed network call.
    pub fn notify(&mut self, notice: Notice) {
        self.notices.push(notice);
    }

    // --- Lifecycle ---

    /// The map finished mounting: attach it and replay queued requests.
    pub fn on_mounted(&mut self, mounted: MountedMap<S>) {
        if self.cancel.is_cancelled() {
            let mut surface = mounted.surface;
            surface.destroy();
            return;
        }
        self.notices.extend(mounted.notices);
        self.mode.set_draw_available(mounted.capabilities.draw_tools);
        self.host.attach(mounted.surface, mounted.capabilities);

        let ids: Vec<ShapeId> = self.store.iter().map(|s| s.id).collect();
        for id in ids {
            if let Err(e) = self.sync_shape_layer(id) {
                tracing::warn!(shape_id = %id, error = %e, "Failed to draw shape");
            }
        }
        if let Some(image) = self.queued_image.take() {
            tracing::debug!(url = %image.url, "Placing image queued before map was ready");
            self.set_image(&image.url, image.aspect);
        }
        if let Some(mode) = self.queued_mode.take() {
            if let Err(e) = self.set_mode(mode) {
                self.report(&e);
            }
        }
    }

    pub fn on_mount_failed(&mut self, err: EditorError) {
        if matches!(err, EditorError::Cancelled) {
            return;
        }
        tracing::error!(error = %err, "Map failed to initialize");
        self.mount_failed = true;
        self.notices
            .push(Notice::error("The map could not be loaded. Editing is unavailable."));
    }

    pub fn set_resize_listener(&mut self, listener: Box<dyn ResizeListener>) {
        self.host.set_resize_listener(listener);
    }

    pub fn handle_resize(&mut self, width: f64, height: f64) {
        self.host.handle_resize(width, height);
    }

    /// Cancel any in-flight mount and release the map.
    pub fn unmount(&mut self) {
        self.cancel.cancel();
        if let Ok(surface) = self.host.surface_mut() {
            self.overlays.teardown(surface);
        } else {
            self.overlays.forget();
        }
        self.host.teardown();
        self.layers.clear();
        self.draft = None;
        self.ticket = None;
        self.popup = None;
    }

    // --- Mode ---

    /// Switch modes. Before the map is ready the request is remembered and
    /// applied once it is.
    pub fn set_mode(&mut self, target: EditorMode) -> Result<bool, EditorError> {
        let Ok(surface) = self.host.surface_mut() else {
            let changed = self.mode() != target;
            self.queued_mode = Some(target);
            return Ok(changed);
        };
        let changed = self.mode.enter(target, surface, &mut self.overlays)?;
        if changed && target == EditorMode::Transform {
            self.draft = None;
        }
        Ok(changed)
    }

    pub fn toggle_mode(&mut self) -> Result<bool, EditorError> {
        self.set_mode(self.mode().toggled())
    }

    /// Pick a draw tool. Takes effect on the live toolbar when attached.
    pub fn select_tool(&mut self, tool: Option<ShapeKind>) {
        self.mode.palette_mut().select(tool);
        let active = self.mode.palette().active_tool;
        if self.draft.as_ref().is_some_and(|d| Some(d.kind()) != active) {
            self.draft = None;
        }
        self.refresh_controls();
    }

    /// Toggle vertex editing and deletion of existing shapes on the toolbar.
    pub fn set_edit_enabled(&mut self, enabled: bool) {
        self.mode.palette_mut().edit_enabled = enabled;
        self.refresh_controls();
    }

    fn refresh_controls(&mut self) {
        if self.mode.palette().is_attached() {
            if let Ok(surface) = self.host.surface_mut() {
                surface.attach_draw_controls(self.mode.palette());
            }
        }
    }

    // --- Overlay ---

    /// Place a new image, replacing the current one. Returns the ticket the
    /// image loader must hand back, or `None` when queued until the map is ready.
    pub fn set_image(&mut self, url: &str, aspect: f64) -> Option<OverlayTicket> {
        let capabilities = self.host.capabilities();
        let Ok(surface) = self.host.surface_mut() else {
            self.queued_image = Some(QueuedImage {
                url: url.to_string(),
                aspect,
            });
            return None;
        };
        let ticket = self.overlays.set_image(surface, url, aspect, capabilities);
        self.ticket = Some(ticket);
        Some(ticket)
    }

    /// Current image-load ticket, for a loader that was not given one directly.
    pub fn overlay_ticket(&self) -> Option<OverlayTicket> {
        self.ticket
    }

    /// The loader measured the image; refit the overlay to its proportions.
    pub fn image_measured(&mut self, ticket: OverlayTicket, width: f64, height: f64) {
        let Ok(surface) = self.host.surface_mut() else {
            return;
        };
        match self.overlays.fit_aspect(surface, ticket, width, height) {
            Ok(()) | Err(EditorError::StaleOverlay) => {}
            Err(e) => self.report(&e),
        }
    }

    pub fn image_loaded(&mut self, ticket: OverlayTicket) {
        let Ok(surface) = self.host.surface_mut() else {
            return;
        };
        match self.overlays.on_image_loaded(surface, ticket) {
            Ok(_) | Err(EditorError::StaleOverlay) => {}
            Err(e) => self.report(&e),
        }
    }

    pub fn image_failed(&mut self, ticket: OverlayTicket) {
        let Ok(surface) = self.host.surface_mut() else {
            return;
        };
        match self.overlays.on_image_failed(surface, ticket) {
            EditorError::StaleOverlay => {}
            e => {
                self.ticket = None;
                self.notices.push(Notice::error(e.to_string()));
            }
        }
    }

    fn transform_gate(&self) -> Result<(), EditorError> {
        if self.form.is_open() {
            return Err(EditorError::FormOpen("Image transform"));
        }
        self.mode.require(Affordance::OverlayTransform)
    }

    pub fn transform_overlay(&mut self, transform: OverlayTransform) -> Result<(), EditorError> {
        self.transform_gate()?;
        let surface = self.host.surface_mut()?;
        self.overlays.apply(surface, transform)
    }

    pub fn select_overlay(&mut self) -> Result<(), EditorError> {
        self.transform_gate()?;
        let surface = self.host.surface_mut()?;
        self.overlays.select(surface)
    }

    pub fn deselect_overlay(&mut self) -> Result<(), EditorError> {
        self.transform_gate()?;
        let surface = self.host.surface_mut()?;
        self.overlays.deselect(surface)
    }

    pub fn set_overlay_opacity(&mut self, opacity: f64) -> Result<f64, EditorError> {
        let surface = self.host.surface_mut()?;
        self.overlays.set_opacity(surface, opacity)
    }

    // --- Drawing ---

    fn annotate_gate(&self) -> Result<(), EditorError> {
        if !self.host.is_ready() {
            return Err(EditorError::NotReady);
        }
        self.mode.require(Affordance::DrawTools)
    }

    fn draw_gate(&self) -> Result<(), EditorError> {
        self.annotate_gate()?;
        if self.form.is_open() {
            return Err(EditorError::FormOpen("Drawing"));
        }
        Ok(())
    }

    /// Add a point with the active tool. Completes the shape when the tool
    /// needs no more points, returning its id.
    pub fn draw_point(&mut self, p: GeoPoint) -> Result<Option<ShapeId>, EditorError> {
        self.draw_gate()?;
        let tool = self
            .mode
            .palette()
            .active_tool
            .ok_or(EditorError::Unavailable("Draw tool"))?;
        let draft = self.draft.get_or_insert_with(|| DrawDraft::new(tool));
        match draft.push(p) {
            DraftStatus::Complete => self.finish_drawing().map(Some),
            DraftStatus::Incomplete => Ok(None),
        }
    }

    /// Finish the current drawing. An invalid ring keeps the draft so the
    /// user can keep adding points.
    pub fn finish_drawing(&mut self) -> Result<ShapeId, EditorError> {
        self.draw_gate()?;
        let draft = self.draft.as_ref().ok_or(EditorError::NoDraft)?;
        let drawn = draft.finish(self.config.circle_segments)?;
        self.draft = None;
        self.create_shape(drawn)
    }

    pub fn undo_point(&mut self) -> Option<GeoPoint> {
        let draft = self.draft.as_mut()?;
        let removed = draft.undo_last();
        if draft.points().is_empty() {
            self.draft = None;
        }
        removed
    }

    pub fn cancel_drawing(&mut self) {
        self.draft = None;
    }

    /// Apply an event emitted by the draw toolbar.
    pub fn handle_draw_event(&mut self, event: DrawEvent) -> Result<Option<ShapeId>, EditorError> {
        match event {
            DrawEvent::Created {
                kind,
                points,
                radius,
            } => {
                self.draw_gate()?;
                let drawn =
                    DrawnGeometry::from_points(kind, &points, radius, self.config.circle_segments)?;
                self.create_shape(drawn).map(Some)
            }
            DrawEvent::Edited {
                shape_id,
                points,
                radius,
            } => {
                self.edit_vertices(shape_id, &points, radius)?;
                Ok(Some(shape_id))
            }
            DrawEvent::Deleted { shape_id } => {
                self.delete_shape(shape_id)?;
                Ok(None)
            }
        }
    }

    fn create_shape(&mut self, drawn: DrawnGeometry) -> Result<ShapeId, EditorError> {
        let id = self.store.insert(drawn, self.clock.now())?;
        self.sync_shape_layer(id)?;
        if let Some(shape) = self.store.get(id) {
            self.form.open_create(shape);
        }
        tracing::info!(shape_id = %id, "Shape drawn");
        Ok(id)
    }

    /// Replace a shape's vertices. Area is recomputed and any override dropped.
    pub fn edit_vertices(
        &mut self,
        id: ShapeId,
        points: &[GeoPoint],
        radius: Option<f64>,
    ) -> Result<bool, EditorError> {
        self.draw_gate()?;
        let kind = self.store.get(id).ok_or(EditorError::UnknownShape(id))?.kind;
        let drawn = DrawnGeometry::from_points(kind, points, radius, self.config.circle_segments)?;
        let changed = self.store.update_ring(id, drawn, self.clock.now())?;
        if changed {
            self.sync_shape_layer(id)?;
            self.refresh_popup(id);
        }
        Ok(changed)
    }

    /// Remove a shape. Closes the attribute form if it is bound to it.
    pub fn delete_shape(&mut self, id: ShapeId) -> Result<(), EditorError> {
        self.annotate_gate()?;
        self.store.remove(id)?;
        self.form.close_if_target(id);
        if self.popup == Some(id) {
            self.close_popup();
        }
        if let Some(layer) = self.layers.remove(&id) {
            self.host.surface_mut()?.remove_layer(layer)?;
        }
        Ok(())
    }

    // --- Attribute form ---

    /// Open the form for an existing shape. Replaces any open form.
    pub fn request_edit(&mut self, id: ShapeId) -> Result<(), EditorError> {
        let shape = self.store.get(id).ok_or(EditorError::UnknownShape(id))?;
        self.form.open_edit(shape);
        self.draft = None;
        Ok(())
    }

    pub fn set_form_name(&mut self, name: &str) -> Result<(), EditorError> {
        self.form.set_name(name)
    }

    pub fn set_form_type(&mut self, type_tag: Option<&str>) -> Result<(), EditorError> {
        self.form.set_type(type_tag, &self.vocabulary)
    }

    pub fn set_form_sub_type(&mut self, sub_type: Option<&str>) -> Result<(), EditorError> {
        self.form.set_sub_type(sub_type)
    }

    pub fn set_form_area(&mut self, text: &str) -> Result<(), EditorError> {
        self.form.set_area(text)
    }

    /// Validate and commit the form. On a validation error the form stays
    /// open with the offending field marked.
    pub fn save_form(&mut self) -> Result<ShapeId, EditorError> {
        let (id, patch) = self.form.save()?;
        let changed = self.store.update_attributes(id, patch, self.clock.now())?;
        if changed {
            self.sync_shape_layer(id)?;
        }
        self.open_popup(id);
        tracing::debug!(shape_id = %id, changed, "Attributes committed");
        Ok(id)
    }

    /// Close the form without touching the shape.
    pub fn cancel_form(&mut self) {
        if let Some(pending) = self.form.cancel() {
            tracing::debug!(shape_id = %pending.target, "Attribute form cancelled");
        }
    }

    // --- Popups and commands ---

    fn popup_for(shape: &Shape) -> Option<Popup> {
        let attrs = &shape.attributes;
        let title = if attrs.name.trim().is_empty() {
            format!("Untitled {}", shape.kind.to_string().to_lowercase())
        } else {
            attrs.name.clone()
        };
        let mut lines = Vec::new();
        match (&attrs.type_tag, &attrs.sub_type_tag) {
            (Some(t), Some(sub)) => lines.push(format!("{t} / {sub}")),
            (Some(t), None) => lines.push(t.clone()),
            _ => {}
        }
        if let Some(area) = shape.display_area() {
            let suffix = if attrs.area_override.is_some() {
                " (entered)"
            } else {
                ""
            };
            lines.push(format!("{area:.2} m²{suffix}"));
        }
        if let Some(radius) = shape.radius {
            lines.push(format!("Radius {radius:.1} m"));
        }
        Some(Popup {
            shape_id: shape.id,
            anchor: shape.anchor()?,
            title,
            lines,
        })
    }

    pub fn open_popup(&mut self, id: ShapeId) {
        let Some(popup) = self.store.get(id).and_then(Self::popup_for) else {
            return;
        };
        if let Ok(surface) = self.host.surface_mut() {
            surface.open_popup(popup);
            self.popup = Some(id);
        }
    }

    fn refresh_popup(&mut self, id: ShapeId) {
        if self.popup == Some(id) {
            self.open_popup(id);
        }
    }

    pub fn close_popup(&mut self) {
        if let Ok(surface) = self.host.surface_mut() {
            surface.close_popup();
        }
        self.popup = None;
    }

    /// Handle everything queued on the command channel.
    pub fn pump_commands(&mut self) {
        for command in self.commands.drain() {
            tracing::debug!(?command, "Editor command");
            let result = match command {
                EditorCommand::RequestEdit(id) => self.request_edit(id),
                EditorCommand::ClosePopup => {
                    self.close_popup();
                    Ok(())
                }
            };
            if let Err(e) = result {
                self.report(&e);
            }
        }
    }

    // --- Export ---

    /// True once at least one shape has a name or type tag.
    pub fn has_annotated_shapes(&self) -> bool {
        self.store.has_annotated()
    }

    /// Serialize every shape and hand the document to `sink`.
    pub fn export_annotations(&mut self, sink: &mut dyn ExportSink) -> Result<usize, EditorError> {
        let document = self.store.export_all();
        let count = document.features.len();
        sink.export(&document)?;
        tracing::info!(features = count, "Annotations exported");
        Ok(count)
    }

    /// Add every shape of a previously exported document.
    pub fn load_document(&mut self, json: &str) -> Result<Vec<ShapeId>, EditorError> {
        let document = FeatureCollection::from_json(json)?;
        let ids = self.store.import(&document)?;
        for id in &ids {
            self.sync_shape_layer(*id)?;
        }
        Ok(ids)
    }

    // --- Rendering ---

    /// Push a shape's ring and style to its map layer, creating it if needed.
    fn sync_shape_layer(&mut self, id: ShapeId) -> Result<(), EditorError> {
        let Ok(surface) = self.host.surface_mut() else {
            return Ok(());
        };
        let shape = self.store.get(id).ok_or(EditorError::UnknownShape(id))?;
        let layer = ShapeLayer {
            shape_id: id,
            kind: shape.kind,
            ring: shape.ring.clone(),
            style: style_for(shape.attributes.type_tag.as_deref(), &self.vocabulary),
        };
        match self.layers.get(&id) {
            Some(layer_id) => surface.update_shape(*layer_id, layer)?,
            None => {
                let layer_id = surface.add_shape(layer);
                self.layers.insert(id, layer_id);
            }
        }
        Ok(())
    }
}
