use crate::scene_graph::SceneObject;

/// Name prefixes checked in order, matched case-insensitively.
const NAME_PREFIXES: &[(&str, &str)] = &[
    ("plat", "platform"),
    ("spawn", "spawner"),
    ("trig", "trigger"),
];

/// Picks the runtime kind of an object: an explicit `kind` tag wins, then a
/// known name prefix, then the object type.
pub fn classify(object: &SceneObject) -> String {
    if let Some(kind) = object.tags.get("kind").and_then(|v| v.as_str()) {
        if !kind.is_empty() {
            return kind.to_string();
        }
    }

    let name = object.name.to_lowercase();
    NAME_PREFIXES
        .iter()
        .find(|(prefix, _)| name.starts_with(prefix))
        .map(|(_, kind)| kind.to_string())
        .unwrap_or_else(|| object.object_type.as_str().to_lowercase())
}
