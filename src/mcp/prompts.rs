//! Modelling recipes served through `prompts/list` and `prompts/get`.

use serde::Serialize;
use serde_json::{json, Value};

/// A named recipe.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct Prompt {
    pub name: &'static str,
    pub description: &'static str,
    #[serde(skip)]
    pub text: &'static str,
}

impl Prompt {
    /// Body of a `prompts/get` reply.
    #[must_use]
    pub fn render(&self) -> Value {
        json!({
            "description": self.description,
            "messages": [{
                "role": "user",
                "content": { "type": "text", "text": self.text },
            }],
        })
    }
}

static PROMPTS: &[Prompt] = &[
    Prompt {
        name: "vase",
        description: "Lofted vase through four circular sections, hollowed with a shell",
        text: "\
Step 1: delete_all to start from an empty design.
Step 2: draw_circle radius 2.5 at x=0, y=0, z=0 on plane XY.
Step 3: draw_circle radius 1.5 at z=4 on plane XY.
Step 4: draw_circle radius 3 at z=8 on plane XY.
Step 5: draw_circle radius 2 at z=12 on plane XY.
Step 6: loft with sketchcount 4.
Step 7: shell_body with thickness 0.3 and faceindex 0 to open the top.
Finish with list_bodies to report the result.",
    },
    Prompt {
        name: "flange",
        description: "Round flange with a bolt circle and an optional centre bore",
        text: "\
Step 1: draw_cylinder with a sensible size (for example radius 5, height 1) at the origin on plane XY.
Step 2: find_face with body_id 0 and direction top to get the top face index.
Step 3: draw_holes on that face with 6 points on a circle of radius 4, for example \
[[4,0],[2,3.46],[-2,3.46],[-4,0],[-2,-3.46],[2,-3.46]], width 0.6 and through true.
Step 4: ask the user whether the flange needs a centre bore.
If yes: draw_circle radius 2 at z=1 on plane XY, then cut_extrude with depth 2.",
    },
    Prompt {
        name: "wine_glass",
        description: "Wine glass revolved from a single closed profile",
        text: "\
Step 1: draw_lines on plane XY with points \
[[0,0],[0,-8],[1.5,-8],[1.5,-7],[0.3,-7],[0.3,-2],[3,-0.5],[3,0],[0,0]].
Step 2: revolve with angle 360.
The profile is closed, so the revolve produces one solid body.",
    },
    Prompt {
        name: "pc_case",
        description: "Prop replica shell that doubles as a small PC case",
        text: "\
Work in centimetres: 1 unit = 1 cm, divide millimetre values by 10.
Step 1: begin_transaction named \"case\" so the build can be rolled back.
Step 2: draw_box with width 20, height 40, depth 35 for the main volume.
Step 3: find_face on body 0 with direction front, then shell_body with thickness 0.4 \
and that faceindex to open the front.
Step 4: find_face direction back, sketch_on_face on it, draw_2d_rectangle for the I/O cut-out, \
then pocket_recess_safe with body_id 0 and a depth of 0.4.
Step 5: draw_holes on the bottom face for the mounting standoffs, width 0.3.
Step 6: rectangular_pattern for the ventilation slots, then fillet_edges with radius 0.2.
Step 7: commit_transaction, then export_step for CAD and export_stl for printing.
If anything fails, rollback_transaction and explain what went wrong.",
    },
    Prompt {
        name: "custom_prop_case",
        description: "Interactive conversion of a reference prop into a working PC case",
        text: "\
Work in centimetres: 1 unit = 1 cm.
Step 1: ask the user for the rough outer dimensions, the motherboard size (ATX, MicroATX \
or Mini-ITX) and the prop details that must be kept.
Step 2: delete_all, then build the outer form with draw_box or draw_cylinder; use loft or \
sweep for organic sections.
Step 3: shell_body with thickness 0.4 to 0.5, or extrude_thin for single walls. Keep \
clearance for an ATX board (30.5 x 24.4 cm plus 2 cm), a GPU up to 35 cm long and a PSU \
of 15 x 8.6 x 14 cm plus 1 cm.
Step 4: motherboard standoffs: find_face for the inner side panel, sketch_on_face on it, then \
draw_holes with width 0.35 at [[2.44,5.08],[2.44,16.51],[2.44,22.86],[16.51,2.54],\
[16.51,22.86],[28.45,2.54],[28.45,16.51],[28.45,22.86]].
Step 5: ventilation: sketch_on_face on the intake panel, draw_polygon with sides 6, \
rectangular_pattern for the array, then pocket_recess or cut_extrude through the wall. \
Aim for 30 to 40 percent open area.
Step 6: PSU mount: draw_holes at [[7.5,3.5],[7.5,10.5],[22.5,3.5],[22.5,10.5]] on the PSU face.
Step 7: I/O cut-out: sketch_on_face on the rear panel, draw_2d_rectangle of 15.8 x 4.4, \
then cut_extrude.
Step 8: details: pocket_recess for panel insets and cable channels, draw_text for labels, \
mirror_feature for symmetric parts, create_work_plane to split parts that exceed the print bed.
Step 9: fillet_edges with radius 0.2 to 0.5 on outer edges; keep walls at least 0.3 thick.
Step 10: export_step and export_stl for each major part.
Report progress to the user after each phase and ask before large changes.",
    },
    Prompt {
        name: "magnet",
        description: "Stepped round magnet holder with a centre bore",
        text: "\
Step 1: draw_cylinder radius 1.59, height 0.3 at x=0, y=0, z=0.18 on plane XY.
Step 2: draw_cylinder radius 1.415, height 0.18 at x=0, y=0, z=0 on plane XY.
Step 3: find_face with body_id 1 and direction top to get the top face of the last body.
Step 4: draw_holes with points [[0,0]], width 1.0, depth 0.21 and that faceindex.",
    },
    Prompt {
        name: "dna",
        description: "Double helix of two circles swept along spiral splines",
        text: "\
Use only draw_circle, spline and sweep.
Strand 1:
Step 1: draw_circle radius 0.5 at x=3, y=0, z=0 on plane XY.
Step 2: spline on plane XY through [[3,0,0],[2.121,2.121,6.25],[0,3,12.5],\
[-2.121,2.121,18.75],[-3,0,25],[-2.121,-2.121,31.25],[0,-3,37.5],[2.121,-2.121,43.75],[3,0,50]].
Step 3: sweep the circle along the spline.
Strand 2:
Step 4: draw_circle radius 0.5 at x=-3, y=0, z=0 on plane XY.
Step 5: spline on plane XY through [[-3,0,0],[-2.121,-2.121,6.25],[0,-3,12.5],\
[2.121,-2.121,18.75],[3,0,25],[2.121,2.121,31.25],[0,3,37.5],[-2.121,2.121,43.75],[-3,0,50]].
Step 6: sweep the second circle along the second spline.",
    },
    Prompt {
        name: "plate",
        description: "Square plate with a hole pattern and a threaded centre bore",
        text: "\
Step 1: draw_box with width 10, height 10, depth 0.5 at the origin on plane XY.
Step 2: find_face with body_id 0 and direction top.
Step 3: draw_holes on that faceindex with width 0.5 and depth 0.2 at \
[[4,4],[4,-4],[-4,4],[-4,-4],[2,2],[2,-2],[-2,2],[-2,-2]].
Step 4: draw_circle radius 1 at x=0, y=0, z=0 on plane XY.
Step 5: cut_extrude with depth 10; the depth must be positive.
Step 6: create_thread with inside true and allsizes 0 for a 1/4 inch thread in the bore.",
    },
    Prompt {
        name: "compensator",
        description: "Thin-walled tube with eight separate stiffening rings",
        text: "\
Step 1: delete_all.
Step 2: draw_circle radius 5 at z=0 on plane XY, then extrude_thin with distance 10 and thickness 0.1.
Step 3: for each height z=1 to z=8, draw_circle radius 5.1 at that z on plane XY, then \
extrude_thin with distance 0.5 and thickness 0.5. Circle and extrusion alternate eight times.
Step 4: do not call boolean_operation; the rings stay separate bodies.
Step 5: fillet_edges with radius 0.2.",
    },
];

/// Every prompt.
#[must_use]
pub fn all() -> &'static [Prompt] {
    PROMPTS
}

#[must_use]
pub fn by_name(name: &str) -> Option<&'static Prompt> {
    PROMPTS.iter().find(|p| p.name == name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops;

    #[test]
    fn render_wraps_text_in_user_message() {
        let p = by_name("vase").unwrap();
        let v = p.render();
        assert_eq!(v["messages"][0]["role"], "user");
        assert!(v["messages"][0]["content"]["text"]
            .as_str()
            .unwrap()
            .contains("loft"));
        assert!(by_name("teapot").is_none());
    }

    #[test]
    fn names_are_unique() {
        let mut names: Vec<_> = all().iter().map(|p| p.name).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), 9);
        assert!(by_name("magnet").unwrap().text.contains("draw_holes"));
    }

    #[test]
    fn recipes_only_mention_known_tools() {
        let extra = ["list_parameters", "count_parameters", "get_result"];
        for p in all() {
            for word in p.text.split(|c: char| !(c.is_ascii_alphanumeric() || c == '_')) {
                if word.contains('_') && word.chars().all(|c| c.is_ascii_lowercase() || c == '_' || c.is_ascii_digit()) {
                    assert!(
                        ops::by_tool(word).is_some()
                            || extra.contains(&word)
                            || ops::all().iter().any(|op| op.fields.iter().any(|f| f.name == word)),
                        "prompt {} mentions unknown tool {word}",
                        p.name
                    );
                }
            }
        }
    }
}
