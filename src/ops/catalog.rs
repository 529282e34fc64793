//! The operation catalogue.
//!
//! One entry per POST path: the internal operation name the pump dispatches
//! on, the ordered request fields that become the command's arguments, the
//! acknowledgement text and the descriptive tool name the gateway exposes.
//! The gateway and the receiver both read this table, so paths, field names
//! and defaults stay identical on both sides.

use serde_json::{json, Map, Value};

use super::fields::{extract_all, Fallback, FieldError, FieldKind, FieldSpec};

/// How an operation is answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    /// Queued; the result is stored but callers rarely need it.
    Action,
    /// Queued; callers are expected to read the result.
    Query,
    /// Answered by the receiver without touching the queue.
    Inline,
}

/// A catalogue entry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Operation {
    /// HTTP path, including the leading slash.
    pub path: &'static str,
    /// Operation name used for dispatch and as the result-store key.
    pub name: &'static str,
    /// Tool name exposed by the MCP gateway.
    pub tool: &'static str,
    pub kind: OperationKind,
    /// Request fields, in argument order.
    pub fields: &'static [FieldSpec],
    /// Acknowledgement message.
    pub ack: &'static str,
    /// Tool description.
    pub description: &'static str,
}

impl Operation {
    /// Builds the positional command arguments from a request body.
    ///
    /// # Errors
    ///
    /// Returns the first field that is missing or cannot be coerced.
    pub fn build_args(&self, body: &Map<String, Value>) -> Result<Vec<Value>, FieldError> {
        extract_all(self.fields, body)
    }

    /// Acknowledgement body for an accepted request.
    #[must_use]
    pub fn ack_body(&self, request_id: &str) -> Value {
        let mut body = json!({
            "message": self.ack,
            "request_id": request_id,
        });
        if self.kind == OperationKind::Query {
            body["note"] = json!(self.poll_note());
        }
        body
    }

    /// Hint telling the caller where to poll for the result.
    #[must_use]
    pub fn poll_note(&self) -> String {
        format!(
            "Call GET /{} for the result (typically available in < 1 second)",
            self.name
        )
    }
}

/// Looks up an operation by its POST path.
#[must_use]
pub fn by_path(path: &str) -> Option<&'static Operation> {
    CATALOG.iter().find(|op| op.path == path)
}

/// Looks up an operation by its operation name.
#[must_use]
pub fn by_name(name: &str) -> Option<&'static Operation> {
    CATALOG.iter().find(|op| op.name == name)
}

/// Looks up an operation by its tool name.
#[must_use]
pub fn by_tool(tool: &str) -> Option<&'static Operation> {
    CATALOG.iter().find(|op| op.tool == tool)
}

/// All catalogue entries.
#[must_use]
pub fn all() -> &'static [Operation] {
    CATALOG
}

const fn field(
    name: &'static str,
    kind: FieldKind,
    default: Fallback,
    description: &'static str,
) -> FieldSpec {
    FieldSpec {
        name,
        kind,
        default,
        description,
    }
}

const fn num(name: &'static str, default: f64, description: &'static str) -> FieldSpec {
    field(name, FieldKind::Number, Fallback::Number(default), description)
}

const fn req_num(name: &'static str, description: &'static str) -> FieldSpec {
    field(name, FieldKind::Number, Fallback::Required, description)
}

const fn int(name: &'static str, default: i64, description: &'static str) -> FieldSpec {
    field(name, FieldKind::Integer, Fallback::Integer(default), description)
}

const fn req_int(name: &'static str, description: &'static str) -> FieldSpec {
    field(name, FieldKind::Integer, Fallback::Required, description)
}

const fn opt_int(name: &'static str, description: &'static str) -> FieldSpec {
    field(name, FieldKind::Integer, Fallback::Null, description)
}

const fn text(name: &'static str, default: &'static str, description: &'static str) -> FieldSpec {
    field(name, FieldKind::Text, Fallback::Text(default), description)
}

const fn req_text(name: &'static str, description: &'static str) -> FieldSpec {
    field(name, FieldKind::Text, Fallback::Required, description)
}

const fn plane(default: Fallback) -> FieldSpec {
    field(
        "plane",
        FieldKind::Text,
        default,
        "Sketch plane: XY (z is the offset), XZ (y is the offset) or YZ (x is the offset)",
    )
}

const XY: FieldSpec = plane(Fallback::Text("XY"));

static CATALOG: &[Operation] = &[
    Operation {
        path: "/set_parameter",
        name: "set_parameter",
        tool: "change_parameter",
        kind: OperationKind::Action,
        fields: &[
            req_text("name", "Model parameter name, e.g. d1"),
            req_text("value", "New expression, e.g. '30 mm' or '2.5'"),
        ],
        ack: "Parameter update requested",
        description: "Changes the expression of a model parameter. Use list_parameters to find names.",
    },
    Operation {
        path: "/undo",
        name: "undo",
        tool: "undo",
        kind: OperationKind::Action,
        fields: &[],
        ack: "Undo requested",
        description: "Undoes the most recent modelling step.",
    },
    Operation {
        path: "/Box",
        name: "draw_box",
        tool: "draw_box",
        kind: OperationKind::Action,
        fields: &[
            num("height", 5.0, "Extent along the plane's second axis (cm)"),
            num("width", 5.0, "Extent along the plane's first axis (cm)"),
            num("depth", 5.0, "Extrusion distance (cm)"),
            num("x", 0.0, "Centre x (cm)"),
            num("y", 0.0, "Centre y (cm)"),
            num("z", 0.0, "Centre z (cm)"),
            plane(Fallback::Null),
        ],
        ack: "Box requested",
        description: "Draws a box centred at (x, y, z). The coordinates are the centre of the base rectangle.",
    },
    Operation {
        path: "/Export_STL",
        name: "export_stl",
        tool: "export_stl",
        kind: OperationKind::Action,
        fields: &[text("Name", "Test.stl", "Export file name")],
        ack: "STL export requested",
        description: "Exports the design as an STL mesh for 3D printing.",
    },
    Operation {
        path: "/Export_STEP",
        name: "export_step",
        tool: "export_step",
        kind: OperationKind::Action,
        fields: &[text("name", "Test.step", "Export file name")],
        ack: "STEP export requested",
        description: "Exports the design as a STEP file.",
    },
    Operation {
        path: "/fillet_edges",
        name: "fillet_edges",
        tool: "fillet_edges",
        kind: OperationKind::Action,
        fields: &[num("radius", 0.3, "Fillet radius (cm)")],
        ack: "Fillet requested",
        description: "Rounds every edge that accepts the radius. Edges that cannot be filleted are skipped and counted.",
    },
    Operation {
        path: "/draw_cylinder",
        name: "draw_cylinder",
        tool: "draw_cylinder",
        kind: OperationKind::Action,
        fields: &[
            req_num("radius", "Cylinder radius (cm)"),
            num("height", 1.0, "Cylinder height (cm)"),
            num("x", 0.0, "Centre x (cm)"),
            num("y", 0.0, "Centre y (cm)"),
            num("z", 0.0, "Centre z (cm)"),
            XY,
        ],
        ack: "Cylinder requested",
        description: "Draws a cylinder whose base circle is centred at (x, y, z). Top face is face 0, bottom face is face 1.",
    },
    Operation {
        path: "/shell_body",
        name: "shell_body",
        tool: "shell_body",
        kind: OperationKind::Action,
        fields: &[
            num("thickness", 0.5, "Wall thickness (cm)"),
            int("faceindex", 0, "Face of the first body to remove"),
        ],
        ack: "Shell requested",
        description: "Hollows the first body, removing the given face and leaving walls of the given thickness.",
    },
    Operation {
        path: "/draw_lines",
        name: "draw_lines",
        tool: "draw_lines",
        kind: OperationKind::Action,
        fields: &[
            field(
                "points",
                FieldKind::PointList,
                Fallback::Points(&[]),
                "Polyline vertices [[x, y], ...]; the last point is joined to the first",
            ),
            XY,
        ],
        ack: "Lines requested",
        description: "Draws a closed polyline in a new sketch.",
    },
    Operation {
        path: "/extrude_last_sketch",
        name: "extrude_last_sketch",
        tool: "extrude",
        kind: OperationKind::Action,
        fields: &[
            num("value", 1.0, "Extrusion distance (cm)"),
            num("taperangle", 0.0, "Taper angle (degrees)"),
        ],
        ack: "Extrusion of the last sketch requested",
        description: "Extrudes the first profile of the last sketch into a new body.",
    },
    Operation {
        path: "/revolve",
        name: "revolve_profile",
        tool: "revolve",
        kind: OperationKind::Action,
        fields: &[num("angle", 360.0, "Revolution angle (degrees)")],
        ack: "Revolve requested",
        description: "Revolves the first profile of the last sketch about that sketch's first line.",
    },
    Operation {
        path: "/arc",
        name: "arc",
        tool: "draw_arc",
        kind: OperationKind::Action,
        fields: &[
            field("point1", FieldKind::Point, Fallback::Point([0.0, 0.0]), "Start point"),
            field("point2", FieldKind::Point, Fallback::Point([1.0, 1.0]), "Point on the arc"),
            field("point3", FieldKind::Point, Fallback::Point([2.0, 0.0]), "End point"),
            field(
                "connect",
                FieldKind::Boolean,
                Fallback::Boolean(false),
                "Close the arc with a straight line",
            ),
            XY,
        ],
        ack: "Arc requested",
        description: "Draws a three-point arc in a new sketch, optionally closed by a chord.",
    },
    Operation {
        path: "/draw_one_line",
        name: "draw_one_line",
        tool: "draw_one_line",
        kind: OperationKind::Action,
        fields: &[
            num("x1", 0.0, "Start x"),
            num("y1", 0.0, "Start y"),
            num("z1", 0.0, "Start z"),
            num("x2", 1.0, "End x"),
            num("y2", 1.0, "End y"),
            num("z2", 0.0, "End z"),
            XY,
        ],
        ack: "Line requested",
        description: "Adds one line to the last sketch, e.g. to close an arc into a half disc.",
    },
    Operation {
        path: "/holes",
        name: "holes",
        tool: "draw_holes",
        kind: OperationKind::Action,
        fields: &[
            field(
                "points",
                FieldKind::PointList,
                Fallback::Points(&[[0.0, 0.0]]),
                "Hole centres [[x, y], ...] in the face's sketch coordinates",
            ),
            num("width", 1.0, "Hole diameter (cm)"),
            field("depth", FieldKind::Number, Fallback::Null, "Hole depth (cm)"),
            field(
                "through",
                FieldKind::Boolean,
                Fallback::Boolean(false),
                "Drill through the whole body",
            ),
            int("faceindex", 0, "Planar face of the last body"),
        ],
        ack: "Holes requested",
        description: "Drills simple holes into a planar face of the last body.",
    },
    Operation {
        path: "/create_circle",
        name: "circle",
        tool: "draw_circle",
        kind: OperationKind::Action,
        fields: &[
            num("radius", 1.0, "Circle radius (cm)"),
            num("x", 0.0, "Centre x"),
            num("y", 0.0, "Centre y"),
            num("z", 0.0, "Centre z"),
            XY,
        ],
        ack: "Circle requested",
        description: "Draws a circle in a new sketch; the out-of-plane coordinate offsets the sketch plane.",
    },
    Operation {
        path: "/extrude_thin",
        name: "extrude_thin",
        tool: "extrude_thin",
        kind: OperationKind::Action,
        fields: &[
            num("thickness", 0.5, "Wall thickness (cm)"),
            num("distance", 1.0, "Extrusion distance (cm)"),
        ],
        ack: "Thin extrusion requested",
        description: "Extrudes the outline of the last sketch's first profile as a thin wall. Preferred for hollow bodies.",
    },
    Operation {
        path: "/select_body",
        name: "select_body",
        tool: "select_body",
        kind: OperationKind::Action,
        fields: &[text("name", "", "Body name, e.g. Body1")],
        ack: "Body selection requested",
        description: "Selects a body by name.",
    },
    Operation {
        path: "/select_sketch",
        name: "select_sketch",
        tool: "select_sketch",
        kind: OperationKind::Action,
        fields: &[text("name", "", "Sketch name, e.g. Sketch1")],
        ack: "Sketch selection requested",
        description: "Selects a sketch by name.",
    },
    Operation {
        path: "/sweep",
        name: "sweep",
        tool: "sweep",
        kind: OperationKind::Action,
        fields: &[],
        ack: "Sweep requested",
        description: "Sweeps the profile of the second-to-last sketch along all curves of the last sketch.",
    },
    Operation {
        path: "/spline",
        name: "spline",
        tool: "spline",
        kind: OperationKind::Action,
        fields: &[
            field(
                "points",
                FieldKind::PointList,
                Fallback::Points(&[]),
                "Fit points [[x, y, z], ...]",
            ),
            XY,
        ],
        ack: "Spline requested",
        description: "Draws a fitted spline in a new sketch, typically as a sweep path.",
    },
    Operation {
        path: "/cut_extrude",
        name: "cut_extrude",
        tool: "cut_extrude",
        kind: OperationKind::Action,
        fields: &[num("depth", 1.0, "Cut depth (cm)")],
        ack: "Cut extrusion requested",
        description: "Cuts the first profile of the last sketch into every body it intersects.",
    },
    Operation {
        path: "/circular_pattern",
        name: "circular_pattern",
        tool: "circular_pattern",
        kind: OperationKind::Action,
        fields: &[
            req_int("quantity", "Total number of instances"),
            text("axis", "X", "Rotation axis: X, Y or Z"),
            XY,
        ],
        ack: "Circular pattern requested",
        description: "Patterns the last body around a world axis over 360 degrees.",
    },
    Operation {
        path: "/offsetplane",
        name: "offsetplane",
        tool: "offset_plane",
        kind: OperationKind::Action,
        fields: &[num("offset", 0.0, "Offset distance (cm)"), XY],
        ack: "Offset plane requested",
        description: "Creates a construction plane offset from an origin plane.",
    },
    Operation {
        path: "/loft",
        name: "loft",
        tool: "loft",
        kind: OperationKind::Action,
        fields: &[int("sketchcount", 2, "Number of trailing sketches to loft through")],
        ack: "Loft requested",
        description: "Lofts through the first profile of each of the last `sketchcount` sketches. Create the sketches first.",
    },
    Operation {
        path: "/ellipsis",
        name: "ellipsis",
        tool: "draw_ellipse",
        kind: OperationKind::Action,
        fields: &[
            num("x_center", 0.0, "Centre x"),
            num("y_center", 0.0, "Centre y"),
            num("z_center", 0.0, "Centre z"),
            num("x_major", 10.0, "Major axis end x"),
            num("y_major", 0.0, "Major axis end y"),
            num("z_major", 0.0, "Major axis end z"),
            num("x_through", 5.0, "Point on the ellipse x"),
            num("y_through", 4.0, "Point on the ellipse y"),
            num("z_through", 0.0, "Point on the ellipse z"),
            XY,
        ],
        ack: "Ellipse requested",
        description: "Draws an ellipse from its centre, a major-axis end point and a point on the curve.",
    },
    Operation {
        path: "/sphere",
        name: "draw_sphere",
        tool: "draw_sphere",
        kind: OperationKind::Action,
        fields: &[
            num("radius", 5.0, "Sphere radius (cm)"),
            num("x", 0.0, "Centre x"),
            num("y", 0.0, "Centre y"),
            num("z", 0.0, "Centre z"),
            XY,
        ],
        ack: "Sphere requested",
        description: "Draws a sphere by revolving a circle about its diameter.",
    },
    Operation {
        path: "/threaded",
        name: "threaded",
        tool: "create_thread",
        kind: OperationKind::Action,
        fields: &[
            field(
                "inside",
                FieldKind::Boolean,
                Fallback::Boolean(true),
                "Internal (true) or external (false) thread",
            ),
            int("allsizes", 30, "Index into the inch size table ('1/4' .. '5', 0..=22)"),
        ],
        ack: "Thread requested",
        description: "Threads the most recent cylindrical face.",
    },
    Operation {
        path: "/delete_everything",
        name: "delete_everything",
        tool: "delete_all",
        kind: OperationKind::Action,
        fields: &[],
        ack: "Deletion of all bodies requested",
        description: "Removes every body from the design. Call before starting a new model.",
    },
    Operation {
        path: "/boolean_operation",
        name: "boolean_operation",
        tool: "boolean_operation",
        kind: OperationKind::Action,
        fields: &[text("operation", "join", "join, cut or intersect")],
        ack: "Boolean operation requested",
        description: "Combines the second body (tool) into the first body (target).",
    },
    Operation {
        path: "/test_connection",
        name: "test_connection",
        tool: "test_connection",
        kind: OperationKind::Inline,
        fields: &[],
        ack: "Connection successful",
        description: "Checks that the CAD bridge is reachable.",
    },
    Operation {
        path: "/draw_2d_rectangle",
        name: "draw_2d_rectangle",
        tool: "draw_2d_rectangle",
        kind: OperationKind::Action,
        fields: &[
            num("x_1", 0.0, "First corner x"),
            num("y_1", 0.0, "First corner y"),
            num("z_1", 0.0, "First corner z"),
            num("x_2", 1.0, "Opposite corner x"),
            num("y_2", 1.0, "Opposite corner y"),
            num("z_2", 0.0, "Opposite corner z"),
            XY,
        ],
        ack: "Rectangle requested",
        description: "Draws a two-corner rectangle in a new sketch.",
    },
    Operation {
        path: "/rectangular_pattern",
        name: "rectangular_pattern",
        tool: "rectangular_pattern",
        kind: OperationKind::Action,
        fields: &[
            text("axis_one", "X", "First direction: X, Y or Z"),
            text("axis_two", "Y", "Second direction: X, Y or Z"),
            int("quantity_one", 2, "Instances in the first direction"),
            int("quantity_two", 2, "Instances in the second direction"),
            num("distance_one", 5.0, "Spacing in the first direction (cm)"),
            num("distance_two", 5.0, "Spacing in the second direction (cm)"),
            XY,
        ],
        ack: "Rectangular pattern requested",
        description: "Patterns the last body along two world axes.",
    },
    Operation {
        path: "/draw_text",
        name: "draw_text",
        tool: "draw_text",
        kind: OperationKind::Action,
        fields: &[
            text("text", "Hello", "Text content"),
            num("thickness", 0.5, "Character height (cm)"),
            num("x_1", 0.0, "Text box corner x"),
            num("y_1", 0.0, "Text box corner y"),
            num("z_1", 0.0, "Text box corner z"),
            num("x_2", 10.0, "Opposite corner x"),
            num("y_2", 4.0, "Opposite corner y"),
            num("z_2", 0.0, "Opposite corner z"),
            num("extrusion_value", 1.0, "Extrusion distance (cm)"),
            XY,
        ],
        ack: "Text requested",
        description: "Writes multi-line text into a box and extrudes it into a new body.",
    },
    Operation {
        path: "/move_body",
        name: "move_body",
        tool: "move_latest_body",
        kind: OperationKind::Action,
        fields: &[
            num("x", 0.0, "Translation x (cm)"),
            num("y", 0.0, "Translation y (cm)"),
            num("z", 0.0, "Translation z (cm)"),
        ],
        ack: "Move requested",
        description: "Moves the last body by (x, y, z).",
    },
    Operation {
        path: "/pocket_recess",
        name: "pocket_recess",
        tool: "pocket_recess",
        kind: OperationKind::Action,
        fields: &[
            num("depth", 1.0, "Pocket depth (cm)"),
            opt_int("face_index", "Planar face of the last body the pocket opens on"),
        ],
        ack: "Pocket requested",
        description: "Cuts the last sketch's first profile into the bodies it overlaps. Sketch on the face first with sketch_on_face.",
    },
    Operation {
        path: "/sketch_on_face",
        name: "sketch_on_face",
        tool: "sketch_on_face",
        kind: OperationKind::Action,
        fields: &[
            int("body_index", -1, "Body index; out of range means the last body"),
            int("face_index", 0, "Planar face index"),
        ],
        ack: "Sketch on face requested",
        description: "Creates a sketch on a planar body face.",
    },
    Operation {
        path: "/create_work_plane",
        name: "create_work_plane",
        tool: "create_work_plane",
        kind: OperationKind::Action,
        fields: &[
            text(
                "plane_type",
                "offset_xy",
                "offset_xy, offset_xz, offset_yz or face_offset",
            ),
            num("offset_distance", 0.0, "Offset distance (cm)"),
            int("reference_index", 0, "Face of the last body, for face_offset"),
        ],
        ack: "Work plane requested",
        description: "Creates a construction plane offset from an origin plane or a face of the last body.",
    },
    Operation {
        path: "/project_edges",
        name: "project_edges",
        tool: "project_edges",
        kind: OperationKind::Action,
        fields: &[opt_int("body_index", "Body to project; default is the last body")],
        ack: "Edge projection requested",
        description: "Projects a body's edges into the last sketch.",
    },
    Operation {
        path: "/draw_polygon",
        name: "draw_polygon",
        tool: "draw_polygon",
        kind: OperationKind::Action,
        fields: &[
            int("sides", 6, "Number of sides"),
            num("radius", 5.0, "Circumradius (cm)"),
            num("x", 0.0, "Centre x"),
            num("y", 0.0, "Centre y"),
            num("z", 0.0, "Centre z"),
            XY,
        ],
        ack: "Polygon requested",
        description: "Draws a regular polygon in a new sketch.",
    },
    Operation {
        path: "/offset_surface",
        name: "offset_surface",
        tool: "offset_surface",
        kind: OperationKind::Action,
        fields: &[
            num("distance", 1.0, "Offset distance (cm)"),
            int("face_index", 0, "Face of the last body"),
        ],
        ack: "Surface offset requested",
        description: "Offsets a face of the last body into a new surface body.",
    },
    Operation {
        path: "/mirror_feature",
        name: "mirror_feature",
        tool: "mirror_feature",
        kind: OperationKind::Action,
        fields: &[
            text("mirror_plane", "XY", "Mirror plane: XY, XZ or YZ"),
            opt_int("body_index", "Body to mirror; default is the last body"),
        ],
        ack: "Mirror requested",
        description: "Mirrors a body across an origin plane into a new body.",
    },
    Operation {
        path: "/pocket_recess_safe",
        name: "pocket_recess_safe",
        tool: "pocket_recess_safe",
        kind: OperationKind::Query,
        fields: &[
            req_int("body_id", "Body to cut into"),
            req_int("sketch_id", "Sketch whose first profile is cut"),
            num("depth", 1.0, "Pocket depth (cm)"),
        ],
        ack: "Safe pocket requested",
        description: "Cuts a sketch into one named body and reports the removed volume.",
    },
    Operation {
        path: "/list_bodies",
        name: "list_bodies",
        tool: "list_bodies",
        kind: OperationKind::Query,
        fields: &[],
        ack: "Body listing requested",
        description: "Lists all bodies with name, volume, bounding box and face count.",
    },
    Operation {
        path: "/list_faces",
        name: "list_faces",
        tool: "list_faces",
        kind: OperationKind::Query,
        fields: &[req_int("body_id", "Body index")],
        ack: "Face listing requested",
        description: "Lists the faces of a body with surface type, area, centroid and normal.",
    },
    Operation {
        path: "/find_face",
        name: "find_face",
        tool: "find_face",
        kind: OperationKind::Query,
        fields: &[
            req_int("body_id", "Body index"),
            text(
                "direction",
                "top",
                "top, bottom, left, right, front or back",
            ),
        ],
        ack: "Face search requested",
        description: "Finds the planar face of a body that points in a direction. Use instead of guessing face indices.",
    },
    Operation {
        path: "/begin_transaction",
        name: "begin_transaction",
        tool: "begin_transaction",
        kind: OperationKind::Query,
        fields: &[text("name", "transaction", "Transaction label")],
        ack: "Transaction start requested",
        description: "Starts recording operations so they can be rolled back together.",
    },
    Operation {
        path: "/commit_transaction",
        name: "commit_transaction",
        tool: "commit_transaction",
        kind: OperationKind::Query,
        fields: &[req_text("transaction_id", "Id returned by begin_transaction")],
        ack: "Transaction commit requested",
        description: "Closes a transaction and returns the recorded operations.",
    },
    Operation {
        path: "/rollback_transaction",
        name: "rollback_transaction",
        tool: "rollback_transaction",
        kind: OperationKind::Query,
        fields: &[req_text("transaction_id", "Id returned by begin_transaction")],
        ack: "Transaction rollback requested",
        description: "Undoes everything done since a transaction began (best effort).",
    },
];
