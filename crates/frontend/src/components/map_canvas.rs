use dioxus::html::geometry::WheelDelta;
use dioxus::html::input_data::MouseButton;
use dioxus::prelude::*;
use siteplan_editor::commands::EditorCommand;
use siteplan_editor::draw::DrawEvent;
use siteplan_editor::overlay::OverlayTransform;
use siteplan_editor::surface::ShapeLayer;
use siteplan_editor::{EditorError, EditorMode, EditorSession, SceneSurface, Shape, ShapeId};
use siteplan_shared::geometry;
use siteplan_shared::models::{GeoPoint, ShapeKind};
use siteplan_shared::viewport::Viewport;

use crate::coords;

pub const MAP_CONTAINER_ID: &str = "siteplan-map-container";

/// Drag threshold in pixels; movement below this is treated as a click.
const DRAG_THRESHOLD: f64 = 3.0;

/// Zoom levels per wheel notch.
const ZOOM_STEP: f64 = 0.25;

/// Grab radius around overlay corners and vertex handles.
const HANDLE_THRESHOLD: f64 = 12.0;

/// Click tolerance around lines, outlines and markers.
const HIT_TOLERANCE: f64 = 6.0;

#[derive(Debug, Clone, Copy, PartialEq)]
enum Drag {
    Pan,
    MoveOverlay,
    Corner(usize),
    Vertex { shape: ShapeId, index: usize },
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Gesture {
    drag: Drag,
    start: (f64, f64),
    last: (f64, f64),
    moved: bool,
}

/// Vertex drag in progress; committed as an edit event on release.
#[derive(Debug, Clone, PartialEq)]
struct VertexPreview {
    shape: ShapeId,
    kind: ShapeKind,
    handles: Vec<GeoPoint>,
}

// ---------------------------------------------------------------------------
// Vertex editing (pure, testable)
// ---------------------------------------------------------------------------

/// Draggable points of a shape: the open ring for closed kinds, the points of
/// a line or marker, and center plus rim for circles.
fn vertex_handles(shape: &Shape) -> Vec<GeoPoint> {
    match shape.kind {
        ShapeKind::Circle => match (shape.anchor(), shape.ring.first()) {
            (Some(center), Some(rim)) => vec![center, *rim],
            _ => vec![],
        },
        kind if kind.is_closed() => {
            let n = shape.ring.len().saturating_sub(1);
            shape.ring[..n].to_vec()
        }
        _ => shape.ring.clone(),
    }
}

/// Move handle `index` to `to`. Dragging a circle's center carries its rim along.
fn drag_handle(kind: ShapeKind, handles: &mut [GeoPoint], index: usize, to: GeoPoint) {
    let Some(from) = handles.get(index).copied() else {
        return;
    };
    handles[index] = to;
    if kind == ShapeKind::Circle && index == 0 {
        if let Some(rim) = handles.get_mut(1) {
            rim.latitude += to.latitude - from.latitude;
            rim.longitude += to.longitude - from.longitude;
        }
    }
}

fn screen_ring(viewport: &Viewport, ring: &[GeoPoint]) -> Vec<(f64, f64)> {
    ring.iter().map(|p| viewport.geo_to_screen(*p)).collect()
}

/// Topmost shape under screen point `p`.
fn shape_at(scene: &SceneSurface, p: (f64, f64)) -> Option<ShapeId> {
    let viewport = scene.viewport();
    let shapes: Vec<&ShapeLayer> = scene.shapes().collect();
    shapes
        .into_iter()
        .rev()
        .find(|s| coords::hits_shape(s.kind, &screen_ring(viewport, &s.ring), p, HIT_TOLERANCE))
        .map(|s| s.shape_id)
}

/// Convert a wheel delta (pixels / lines / pages) to a uniform pixel-like value.
fn wheel_delta_y(delta: WheelDelta) -> f64 {
    match delta {
        WheelDelta::Pixels(d) => d.y,
        WheelDelta::Lines(d) => d.y * 40.0,
        WheelDelta::Pages(d) => d.y * 400.0,
    }
}

fn container_point(client: (f64, f64)) -> Option<(f64, f64)> {
    let rect = coords::container_rect(MAP_CONTAINER_ID)?;
    Some(coords::client_to_container(client.0, client.1, rect.left(), rect.top()))
}

fn report(session: &mut Signal<EditorSession<SceneSurface>>, result: Result<(), EditorError>) {
    if let Err(e) = result {
        session.write().report(&e);
    }
}

// ---------------------------------------------------------------------------
// SVG builder
// ---------------------------------------------------------------------------

/// Build the vector layer (shapes, draft, handles) as an SVG string.
fn build_svg_content(
    viewport: &Viewport,
    shapes: &[ShapeLayer],
    selected: Option<ShapeId>,
    draft: Option<(ShapeKind, &[GeoPoint])>,
    overlay_handles: Option<[GeoPoint; 4]>,
    vertex_handles: &[GeoPoint],
) -> String {
    let mut svg = String::with_capacity(4096);
    for shape in shapes {
        build_shape(&mut svg, viewport, shape, selected == Some(shape.shape_id));
    }
    if let Some((kind, points)) = draft {
        build_draft(&mut svg, viewport, kind, points);
    }
    if let Some(corners) = overlay_handles {
        for corner in corners {
            let (x, y) = viewport.geo_to_screen(corner);
            svg.push_str(&format!(
                r##"<rect x="{}" y="{}" width="10" height="10" fill="white" stroke="#222" stroke-width="1.5"/>"##,
                x - 5.0,
                y - 5.0
            ));
        }
    }
    for handle in vertex_handles {
        let (x, y) = viewport.geo_to_screen(*handle);
        svg.push_str(&format!(
            r##"<circle cx="{x}" cy="{y}" r="5" fill="white" stroke="#222" stroke-width="1.5"/>"##
        ));
    }
    svg
}

fn build_shape(svg: &mut String, viewport: &Viewport, shape: &ShapeLayer, selected: bool) {
    let style = shape.style;
    let color = style.color;
    let points = screen_ring(viewport, &shape.ring);
    match shape.kind {
        ShapeKind::Marker => {
            if let Some(&(x, y)) = points.first() {
                svg.push_str(&format!(
                    r##"<circle cx="{x}" cy="{y}" r="7" fill="{color}" stroke="white" stroke-width="2"/>"##
                ));
            }
        }
        ShapeKind::Polyline => {
            let d = coords::ring_path(&points, false);
            let w = style.weight;
            svg.push_str(&format!(
                r##"<path d="{d}" fill="none" stroke="{color}" stroke-width="{w}" stroke-linejoin="round"/>"##
            ));
        }
        _ => {
            let d = coords::ring_path(&points, true);
            let w = style.weight;
            let fo = style.fill_opacity;
            svg.push_str(&format!(
                r##"<path d="{d}" fill="{color}" fill-opacity="{fo}" stroke="{color}" stroke-width="{w}"/>"##
            ));
        }
    }
    if selected && shape.kind != ShapeKind::Marker {
        let d = coords::ring_path(&points, shape.kind.is_closed());
        svg.push_str(&format!(
            r##"<path d="{d}" fill="none" stroke="white" stroke-width="2" stroke-dasharray="6 4"/>"##
        ));
    }
}

fn build_draft(svg: &mut String, viewport: &Viewport, kind: ShapeKind, points: &[GeoPoint]) {
    let screen = screen_ring(viewport, points);
    if screen.len() > 1 {
        let d = coords::ring_path(&screen, false);
        svg.push_str(&format!(
            r##"<path d="{d}" fill="none" stroke="#ff7800" stroke-width="2" stroke-dasharray="5 5"/>"##
        ));
    }
    let r = if kind == ShapeKind::Circle { 5.0 } else { 4.0 };
    for (x, y) in screen {
        svg.push_str(&format!(
            r##"<circle cx="{x}" cy="{y}" r="{r}" fill="#ff7800" stroke="white" stroke-width="1.5"/>"##
        ));
    }
}

// ---------------------------------------------------------------------------
// Component
// ---------------------------------------------------------------------------

#[component]
pub fn MapCanvas(session: Signal<EditorSession<SceneSurface>>) -> Element {
    let mut session = session;
    let mut gesture = use_signal(|| None::<Gesture>);
    let mut preview = use_signal(|| None::<VertexPreview>);
    let mut hover = use_signal(|| None::<GeoPoint>);

    let svg_html = use_memo(move || {
        let s = session.read();
        let Some(scene) = s.surface() else {
            return String::new();
        };
        let viewport = scene.viewport();
        let preview = preview.read();
        let mut shapes: Vec<ShapeLayer> = scene.shapes().cloned().collect();
        if let Some(p) = preview.as_ref() {
            // Show the dragged geometry in place of the stored one
            if let Some(layer) = shapes.iter_mut().find(|l| l.shape_id == p.shape) {
                layer.ring = match (p.kind, p.handles.as_slice()) {
                    (ShapeKind::Circle, [center, rim]) => geometry::circle_ring(
                        *center,
                        geometry::distance_m(*center, *rim),
                        s.config().circle_segments,
                    ),
                    (kind, handles) if kind.is_closed() => geometry::close_ring(handles),
                    (_, handles) => handles.to_vec(),
                };
            }
        }
        let selected = scene.popup().map(|p| p.shape_id);
        let handles: Vec<GeoPoint> = match (preview.as_ref(), selected) {
            (Some(p), _) => p.handles.clone(),
            (None, Some(id)) if s.mode() == EditorMode::Annotate && s.palette().edit_enabled => {
                s.store().get(id).map(vertex_handles).unwrap_or_default()
            }
            _ => vec![],
        };
        let svg_content = build_svg_content(
            viewport,
            &shapes,
            selected,
            s.draft().map(|d| (d.kind(), d.points())),
            s.overlay_handles(),
            &handles,
        );
        format!(
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{}" height="{}" style="position:absolute;top:0;left:0;pointer-events:none;z-index:5;">{}</svg>"#,
            viewport.width, viewport.height, svg_content
        )
    });

    let s = session.read();
    let Some(scene) = s.surface() else {
        let message = if s.is_failed() {
            "The map could not be loaded."
        } else {
            "Loading map…"
        };
        return rsx! {
            div { id: MAP_CONTAINER_ID, class: "map-container loading",
                div { class: "map-status", "{message}" }
            }
        };
    };

    let viewport = *scene.viewport();
    let tiles: Vec<(String, f64, f64, f64)> = viewport
        .tiles()
        .into_iter()
        .map(|t| (s.config().tile_url_for(t.z, t.x, t.y), t.screen_x, t.screen_y, t.size))
        .collect();
    let overlays: Vec<(String, String, bool)> = scene
        .overlays()
        .filter_map(|o| {
            let corners = o.corners.map(|c| viewport.geo_to_screen(c));
            let matrix = coords::overlay_matrix3d(corners)?;
            let style = format!(
                "width:{base}px;height:{base}px;opacity:{op};transform:{matrix};",
                base = coords::OVERLAY_BASE_PX,
                op = o.opacity,
            );
            Some((o.url.clone(), style, o.selected))
        })
        .collect();
    let popup = scene.popup().map(|p| {
        let (x, y) = viewport.geo_to_screen(p.anchor);
        (p.shape_id, p.title.clone(), p.lines.clone(), x, y)
    });

    let dragging = gesture.read().is_some_and(|g| g.moved);
    let drawing = s.mode() == EditorMode::Annotate && s.palette().active_tool.is_some();
    let cursor = if dragging {
        "grabbing"
    } else if drawing {
        "crosshair"
    } else {
        scene.cursor().css()
    };
    let readout = (*hover.read()).map(coords::format_geo);
    let sender = s.command_sender();
    drop(s);

    rsx! {
        div {
            id: MAP_CONTAINER_ID,
            class: "map-container",
            style: "cursor: {cursor};",
            tabindex: "0",

            onwheel: move |evt: Event<WheelData>| {
                evt.prevent_default();
                let delta_y = wheel_delta_y(evt.data().delta());
                let client = evt.data().client_coordinates();
                let Some((cx, cy)) = container_point((client.x, client.y)) else { return };
                let mut s = session.write();
                let step = if delta_y < 0.0 { ZOOM_STEP } else { -ZOOM_STEP };
                let Some(zoom) = s.surface().map(|m| m.viewport().zoom) else { return };
                let new_zoom = s.config().clamp_zoom(zoom + step);
                if (new_zoom - zoom).abs() < 1e-9 {
                    return;
                }
                if let Some(surface) = s.surface_mut() {
                    surface.viewport_mut().zoom_at(cx, cy, new_zoom);
                }
            },

            onmousedown: move |evt: Event<MouseData>| {
                if evt.trigger_button() != Some(MouseButton::Primary) {
                    return;
                }
                let client = evt.client_coordinates();
                let c = (client.x, client.y);
                let Some(p) = container_point(c) else { return };

                let s = session.read();
                let Some(scene) = s.surface() else { return };
                let vp = scene.viewport();
                let mut drag = Drag::Pan;
                match s.mode() {
                    EditorMode::Transform => {
                        if let Some(corners) = s.overlay_handles() {
                            let screen = corners.map(|g| vp.geo_to_screen(g));
                            if let Some(i) = coords::find_nearest(&screen, p, HANDLE_THRESHOLD) {
                                drag = Drag::Corner(i);
                            } else if coords::point_in_polygon(p, &screen) {
                                drag = Drag::MoveOverlay;
                            }
                        }
                    }
                    EditorMode::Annotate => {
                        let selected = scene.popup().map(|p| p.shape_id);
                        let shape = selected.and_then(|id| s.store().get(id));
                        if let (true, Some(shape)) = (s.palette().edit_enabled, shape) {
                            let handles = vertex_handles(shape);
                            let screen = screen_ring(vp, &handles);
                            if let Some(index) = coords::find_nearest(&screen, p, HANDLE_THRESHOLD) {
                                drag = Drag::Vertex { shape: shape.id, index };
                                preview.set(Some(VertexPreview {
                                    shape: shape.id,
                                    kind: shape.kind,
                                    handles,
                                }));
                            }
                        }
                    }
                }
                drop(s);
                gesture.set(Some(Gesture { drag, start: c, last: c, moved: false }));
            },

            onmousemove: move |evt: Event<MouseData>| {
                let client = evt.client_coordinates();
                let c = (client.x, client.y);
                let Some(vp) = session.read().surface().map(|m| *m.viewport()) else { return };
                let Some(p) = container_point(c) else { return };
                hover.set(Some(vp.screen_to_geo(p.0, p.1)));

                let Some(mut g) = *gesture.read() else { return };
                if !g.moved && coords::point_distance(g.start, c) > DRAG_THRESHOLD {
                    g.moved = true;
                }
                if g.moved {
                    let (dx, dy) = (c.0 - g.last.0, c.1 - g.last.1);
                    let (lx, ly) = (p.0 - dx, p.1 - dy);
                    let from = vp.screen_to_geo(lx, ly);
                    let to = vp.screen_to_geo(p.0, p.1);
                    match g.drag {
                        Drag::Pan => {
                            if let Some(surface) = session.write().surface_mut() {
                                surface.viewport_mut().pan_by(dx, dy);
                            }
                        }
                        Drag::MoveOverlay => {
                            let result = session.write().transform_overlay(OverlayTransform::Move {
                                d_lat: to.latitude - from.latitude,
                                d_lon: to.longitude - from.longitude,
                            });
                            if result.is_err() {
                                gesture.set(None);
                                return report(&mut session, result);
                            }
                        }
                        Drag::Corner(corner) => {
                            let result = session
                                .write()
                                .transform_overlay(OverlayTransform::Distort { corner, to });
                            if result.is_err() {
                                gesture.set(None);
                                return report(&mut session, result);
                            }
                        }
                        Drag::Vertex { index, .. } => {
                            if let Some(p) = preview.write().as_mut() {
                                drag_handle(p.kind, &mut p.handles, index, to);
                            }
                        }
                    }
                }
                g.last = c;
                gesture.set(Some(g));
            },

            onmouseup: move |evt: Event<MouseData>| {
                let Some(g) = gesture.write().take() else { return };
                if g.moved {
                    if let Drag::Vertex { shape, .. } = g.drag {
                        if let Some(edit) = preview.write().take() {
                            let result = session
                                .write()
                                .handle_draw_event(DrawEvent::Edited {
                                    shape_id: shape,
                                    points: edit.handles,
                                    radius: None,
                                })
                                .map(|_| ());
                            report(&mut session, result);
                        }
                    }
                    return;
                }
                preview.set(None);

                let client = evt.client_coordinates();
                let Some(p) = container_point((client.x, client.y)) else { return };
                let mut s = session.write();
                let Some(scene) = s.surface() else { return };
                let vp = *scene.viewport();
                let hit = shape_at(scene, p);
                let geo = vp.screen_to_geo(p.0, p.1);

                match s.mode() {
                    EditorMode::Transform => {
                        let on_overlay = s.overlay().is_some_and(|o| {
                            coords::point_in_polygon(p, &o.corners.map(|c| vp.geo_to_screen(c)))
                        });
                        let result = if on_overlay { s.select_overlay() } else { s.deselect_overlay() };
                        match result {
                            Ok(()) | Err(EditorError::NoOverlay) | Err(EditorError::OverlayLocked) => {}
                            Err(e) => s.report(&e),
                        }
                        match hit {
                            Some(id) if !on_overlay => s.open_popup(id),
                            _ => s.close_popup(),
                        }
                    }
                    EditorMode::Annotate => {
                        let drawing = s.draft().is_some();
                        if let (false, Some(id)) = (drawing, hit) {
                            s.open_popup(id);
                        } else if drawing || s.palette().active_tool.is_some() {
                            if let Err(e) = s.draw_point(geo) {
                                s.report(&e);
                            }
                        } else {
                            s.close_popup();
                        }
                    }
                }
            },

            onmouseleave: move |_| {
                gesture.set(None);
                preview.set(None);
                hover.set(None);
            },

            ondoubleclick: move |evt: Event<MouseData>| {
                evt.prevent_default();
                let mut s = session.write();
                if s.mode() == EditorMode::Annotate && s.draft().is_some() {
                    if let Err(e) = s.finish_drawing() {
                        s.report(&e);
                    }
                }
            },

            oncontextmenu: move |evt: Event<MouseData>| {
                evt.prevent_default();
                let client = evt.client_coordinates();
                let Some(p) = container_point((client.x, client.y)) else { return };
                let mut s = session.write();
                if s.mode() != EditorMode::Annotate || !s.palette().edit_enabled {
                    return;
                }
                let Some(id) = s.surface().and_then(|scene| shape_at(scene, p)) else { return };
                if let Err(e) = s.handle_draw_event(DrawEvent::Deleted { shape_id: id }) {
                    s.report(&e);
                }
            },

            onkeydown: move |evt: Event<KeyboardData>| {
                let mut s = session.write();
                match evt.key() {
                    Key::Escape => {
                        s.cancel_drawing();
                        s.close_popup();
                    }
                    Key::Enter => {
                        if s.draft().is_some() {
                            if let Err(e) = s.finish_drawing() {
                                s.report(&e);
                            }
                        }
                    }
                    Key::Backspace => {
                        s.undo_point();
                    }
                    _ => {}
                }
            },

            div { class: "map-tiles",
                for (url, x, y, size) in tiles {
                    img {
                        key: "{url}",
                        class: "map-tile",
                        src: "{url}",
                        draggable: "false",
                        style: "left:{x}px;top:{y}px;width:{size}px;height:{size}px;",
                    }
                }
            }

            for (url, style, selected) in overlays {
                img {
                    class: if selected { "overlay-image selected" } else { "overlay-image" },
                    src: "{url}",
                    draggable: "false",
                    style: "{style}",
                }
            }

            div {
                dangerous_inner_html: "{svg_html}",
                style: "position:absolute;top:0;left:0;width:100%;height:100%;pointer-events:none;",
            }

            if let Some((id, title, lines, x, y)) = popup {
                div {
                    class: "map-popup",
                    style: "left:{x}px;top:{y}px;",
                    onmousedown: move |evt: Event<MouseData>| evt.stop_propagation(),
                    onmouseup: move |evt: Event<MouseData>| evt.stop_propagation(),
                    div { class: "popup-title", "{title}" }
                    for line in lines {
                        div { class: "popup-line", "{line}" }
                    }
                    div { class: "popup-actions",
                        button {
                            onclick: {
                                let sender = sender.clone();
                                move |_| {
                                    sender.request_edit(id);
                                    session.write().pump_commands();
                                }
                            },
                            "Edit"
                        }
                        button {
                            class: "secondary",
                            onclick: {
                                let sender = sender.clone();
                                move |_| {
                                    sender.send(EditorCommand::ClosePopup);
                                    session.write().pump_commands();
                                }
                            },
                            "Close"
                        }
                    }
                }
            }

            if let Some(text) = readout {
                div { class: "coord-readout",
                    span { class: "coord-tag", "{text}" }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use siteplan_editor::draw::DrawnGeometry;
    use siteplan_editor::style::UNTAGGED;

    fn shape(kind: ShapeKind, points: &[GeoPoint], radius: Option<f64>) -> Shape {
        let drawn = DrawnGeometry::from_points(kind, points, radius, 16).unwrap();
        Shape::new(ShapeId(1), drawn, Utc::now()).unwrap()
    }

    fn square() -> Vec<GeoPoint> {
        vec![
            GeoPoint::new(51.0, 0.0),
            GeoPoint::new(51.0, 0.001),
            GeoPoint::new(51.001, 0.001),
            GeoPoint::new(51.001, 0.0),
        ]
    }

    fn viewport() -> Viewport {
        Viewport::new(GeoPoint::new(51.0005, 0.0005), 17.0, 800.0, 600.0)
    }

    #[test]
    fn test_vertex_handles_drop_closing_point() {
        let handles = vertex_handles(&shape(ShapeKind::Polygon, &square(), None));
        assert_eq!(handles, square());
    }

    #[test]
    fn test_vertex_handles_for_circle_are_center_and_rim() {
        let center = GeoPoint::new(51.0, 0.0);
        let circle = shape(ShapeKind::Circle, &[center], Some(50.0));
        let handles = vertex_handles(&circle);
        assert_eq!(handles.len(), 2);
        assert!((handles[0].latitude - center.latitude).abs() < 1e-6);
        assert!((handles[0].longitude - center.longitude).abs() < 1e-6);
    }

    #[test]
    fn test_drag_circle_center_moves_rim() {
        let mut handles = vec![GeoPoint::new(51.0, 0.0), GeoPoint::new(51.001, 0.0)];
        drag_handle(ShapeKind::Circle, &mut handles, 0, GeoPoint::new(51.002, 0.003));
        assert!((handles[1].latitude - 51.003).abs() < 1e-9);
        assert!((handles[1].longitude - 0.003).abs() < 1e-9);
    }

    #[test]
    fn test_drag_polygon_vertex_moves_only_that_vertex() {
        let mut handles = square();
        drag_handle(ShapeKind::Polygon, &mut handles, 2, GeoPoint::new(51.002, 0.002));
        assert_eq!(handles[2], GeoPoint::new(51.002, 0.002));
        assert_eq!(handles[0], square()[0]);
        assert_eq!(handles[1], square()[1]);
        // Out of range is ignored
        drag_handle(ShapeKind::Polygon, &mut handles, 9, GeoPoint::new(0.0, 0.0));
        assert_eq!(handles.len(), 4);
    }

    #[test]
    fn test_svg_contains_shapes_draft_and_handles() {
        let layer = ShapeLayer {
            shape_id: ShapeId(1),
            kind: ShapeKind::Polygon,
            ring: geometry::close_ring(&square()),
            style: UNTAGGED,
        };
        let marker = ShapeLayer {
            shape_id: ShapeId(2),
            kind: ShapeKind::Marker,
            ring: vec![GeoPoint::new(51.0005, 0.0005)],
            style: UNTAGGED,
        };
        let draft = [GeoPoint::new(51.0, 0.0), GeoPoint::new(51.0002, 0.0002)];
        let svg = build_svg_content(
            &viewport(),
            &[layer, marker],
            Some(ShapeId(1)),
            Some((ShapeKind::Polygon, &draft)),
            None,
            &square(),
        );
        assert_eq!(svg.matches("<path").count(), 3, "shape, selection outline, draft line");
        assert!(svg.contains("stroke-dasharray=\"6 4\""));
        // marker + 2 draft vertices + 4 vertex handles
        assert_eq!(svg.matches("<circle").count(), 7);
    }

    #[test]
    fn test_svg_overlay_handles() {
        let corners = [
            GeoPoint::new(51.001, 0.0),
            GeoPoint::new(51.001, 0.001),
            GeoPoint::new(51.0, 0.001),
            GeoPoint::new(51.0, 0.0),
        ];
        let svg = build_svg_content(&viewport(), &[], None, None, Some(corners), &[]);
        assert_eq!(svg.matches("<rect").count(), 4);
    }

    #[test]
    fn test_polyline_is_not_filled() {
        let layer = ShapeLayer {
            shape_id: ShapeId(3),
            kind: ShapeKind::Polyline,
            ring: vec![GeoPoint::new(51.0, 0.0), GeoPoint::new(51.001, 0.001)],
            style: UNTAGGED,
        };
        let mut svg = String::new();
        build_shape(&mut svg, &viewport(), &layer, false);
        assert!(svg.contains(r#"fill="none""#));
        assert!(!svg.contains('Z'));
    }
}
