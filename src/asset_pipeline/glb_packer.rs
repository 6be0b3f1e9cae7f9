// Packs the source glTF asset into a single binary GLB next to the level
// document. The asset is already Y up, so nothing is re-oriented here.

use std::borrow::Cow;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use base64::Engine as _;
use gltf::binary::{Glb, Header};
use serde_json::{json, Map, Value};

use crate::export::create_parent_dir;
use crate::export::sidecar::{SidecarExporter, SidecarRequest, SidecarStatus};
use crate::scene_graph::mesh::Buffers;

pub struct GlbPacker<'a> {
    document: &'a gltf::Document,
    buffers: Buffers<'a>,
    /// Directory relative image URIs are resolved against.
    base_dir: Option<PathBuf>,
}

impl<'a> GlbPacker<'a> {
    pub fn new(document: &'a gltf::Document, buffers: Buffers<'a>) -> Self {
        Self {
            document,
            buffers,
            base_dir: None,
        }
    }

    pub fn with_base_dir(mut self, base_dir: impl Into<PathBuf>) -> Self {
        self.base_dir = Some(base_dir.into());
        self
    }

    /// Serializes the asset as GLB bytes: the JSON chunk with every buffer and
    /// image merged into the binary chunk. With a selection, only the named
    /// nodes and their ancestors are kept.
    pub fn pack(&self, selection: Option<&[String]>) -> anyhow::Result<Vec<u8>> {
        let mut root = serde_json::to_value(self.document.as_json())?;
        let (mut bin, offsets) = merge_buffers(self.buffers);

        let object = root.as_object_mut().context("glTF root is not an object")?;

        if let Some(Value::Array(views)) = object.get_mut("bufferViews") {
            for view in views.iter_mut() {
                let buffer = view["buffer"].as_u64().context("Buffer view without buffer")? as usize;
                let base = *offsets
                    .get(buffer)
                    .with_context(|| format!("Buffer view references missing buffer {buffer}"))?;
                let offset = view.get("byteOffset").and_then(Value::as_u64).unwrap_or(0);

                view["buffer"] = json!(0);
                view["byteOffset"] = json!(base as u64 + offset);
            }
        }

        self.embed_images(object, &mut bin)?;

        if let Some(selection) = selection {
            prune_to_selection(object, selection);
        }

        if bin.is_empty() {
            object.remove("buffers");
        } else {
            object.insert("buffers".into(), json!([{ "byteLength": bin.len() }]));
        }

        let json = serde_json::to_vec(&root)?;
        let glb = Glb {
            header: Header {
                magic: *b"glTF",
                version: 2,
                length: 0,
            },
            json: Cow::Owned(json),
            bin: (!bin.is_empty()).then_some(Cow::Owned(bin)),
        };

        Ok(glb.to_vec()?)
    }

    /// Moves every URI-sourced image into the binary chunk behind a new
    /// buffer view.
    fn embed_images(&self, root: &mut Map<String, Value>, bin: &mut Vec<u8>) -> anyhow::Result<()> {
        let images = match root.remove("images") {
            Some(Value::Array(images)) => images,
            Some(other) => {
                root.insert("images".into(), other);
                return Ok(());
            }
            None => return Ok(()),
        };

        let mut embedded = Vec::with_capacity(images.len());
        for (index, mut image) in images.into_iter().enumerate() {
            let Some(uri) = image.get("uri").and_then(Value::as_str).map(String::from) else {
                embedded.push(image);
                continue;
            };

            let (bytes, uri_mime) = self
                .read_uri(&uri)
                .with_context(|| format!("Failed to embed image {index}"))?;
            let mime_type = image
                .get("mimeType")
                .and_then(Value::as_str)
                .map(String::from)
                .or(uri_mime)
                .or_else(|| mime_from_extension(&uri).map(String::from))
                .with_context(|| format!("Image {index} has no known MIME type"))?;

            let views = root
                .entry("bufferViews")
                .or_insert_with(|| json!([]))
                .as_array_mut()
                .context("bufferViews is not an array")?;
            let view_index = views.len();
            views.push(json!({
                "buffer": 0,
                "byteOffset": bin.len(),
                "byteLength": bytes.len(),
            }));
            bin.extend_from_slice(&bytes);
            bin.resize(bin.len().next_multiple_of(4), 0);

            if let Some(fields) = image.as_object_mut() {
                fields.remove("uri");
                fields.insert("bufferView".into(), json!(view_index));
                fields.insert("mimeType".into(), json!(mime_type));
            }
            embedded.push(image);
        }

        root.insert("images".into(), Value::Array(embedded));
        Ok(())
    }

    /// Bytes behind an image URI, and the MIME type a data URI declares.
    fn read_uri(&self, uri: &str) -> anyhow::Result<(Vec<u8>, Option<String>)> {
        if let Some(data) = uri.strip_prefix("data:") {
            let (header, payload) = data.split_once(',').context("Malformed data URI")?;
            let Some(mime) = header.strip_suffix(";base64") else {
                bail!("Only base64 data URIs are supported");
            };
            let bytes = base64::engine::general_purpose::STANDARD.decode(payload)?;
            let mime = (!mime.is_empty()).then(|| mime.to_string());
            return Ok((bytes, mime));
        }

        let Some(base_dir) = &self.base_dir else {
            bail!("External image {uri} without a base directory");
        };
        let relative = urlencoding::decode(uri)?;
        let path = base_dir.join(Path::new(relative.as_ref()));
        let bytes = std::fs::read(&path).with_context(|| format!("Failed to read {}", path.display()))?;
        Ok((bytes, None))
    }

    fn write(&self, request: &SidecarRequest) -> anyhow::Result<()> {
        let bytes = self.pack(request.selection.as_deref())?;
        create_parent_dir(&request.path)?;
        std::fs::write(&request.path, bytes)
            .with_context(|| format!("Failed to write {}", request.path.display()))?;
        Ok(())
    }
}

impl SidecarExporter for GlbPacker<'_> {
    fn export(&mut self, request: &SidecarRequest) -> SidecarStatus {
        match self.write(request) {
            Ok(()) => SidecarStatus::Finished {
                file: request.path.clone(),
            },
            Err(err) => SidecarStatus::Failed(format!("{err:#}")),
        }
    }
}

/// Concatenates buffers, each starting on a 4 byte boundary. Returns the
/// merged bytes and the start offset of every source buffer.
fn merge_buffers(buffers: Buffers) -> (Vec<u8>, Vec<usize>) {
    let mut bin = Vec::new();
    let mut offsets = Vec::with_capacity(buffers.len());

    for buffer in buffers {
        offsets.push(bin.len());
        bin.extend_from_slice(buffer);
        bin.resize(bin.len().next_multiple_of(4), 0);
    }

    (bin, offsets)
}

fn mime_from_extension(uri: &str) -> Option<&'static str> {
    let extension = Path::new(uri).extension()?.to_str()?.to_ascii_lowercase();
    match extension.as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        _ => None,
    }
}

/// Drops every node that is neither selected nor an ancestor of a selected
/// node, and rewrites node references in scenes, skins and animations.
fn prune_to_selection(root: &mut Map<String, Value>, selection: &[String]) {
    let Some(Value::Array(nodes)) = root.get("nodes") else {
        return;
    };

    let selected = selection.iter().map(String::as_str).collect::<HashSet<_>>();
    let mut parents = vec![None; nodes.len()];
    for (index, node) in nodes.iter().enumerate() {
        for child in child_indices(node) {
            if let Some(parent) = parents.get_mut(child) {
                *parent = Some(index);
            }
        }
    }

    let mut keep = vec![false; nodes.len()];
    for (index, node) in nodes.iter().enumerate() {
        let name = node.get("name").and_then(Value::as_str);
        if !name.is_some_and(|name| selected.contains(name)) {
            continue;
        }

        let mut current = Some(index);
        while let Some(i) = current {
            if keep[i] {
                break;
            }
            keep[i] = true;
            current = parents[i];
        }
    }

    let node_map = index_map(&keep);
    let kept_nodes = nodes
        .iter()
        .zip(&keep)
        .filter(|(_, &keep)| keep)
        .map(|(node, _)| node.clone())
        .collect::<Vec<_>>();

    let skin_map = match root.get_mut("skins") {
        Some(Value::Array(skins)) => {
            let keep_skins = skins
                .iter()
                .map(|skin| {
                    let joints_kept = skin
                        .get("joints")
                        .and_then(Value::as_array)
                        .is_some_and(|joints| joints.iter().all(|j| remap(j, &node_map).is_some()));
                    let skeleton_kept = skin.get("skeleton").map_or(true, |s| remap(s, &node_map).is_some());
                    joints_kept && skeleton_kept
                })
                .collect::<Vec<_>>();
            let skin_map = index_map(&keep_skins);

            let mut kept = Vec::new();
            for (mut skin, keep) in skins.drain(..).zip(keep_skins) {
                if !keep {
                    continue;
                }
                remap_list(skin.get_mut("joints"), &node_map);
                if let Some(skeleton) = skin.get_mut("skeleton") {
                    *skeleton = json!(remap(skeleton, &node_map));
                }
                kept.push(skin);
            }
            *skins = kept;
            skin_map
        }
        _ => Vec::new(),
    };

    let kept_nodes = kept_nodes
        .into_iter()
        .map(|mut node| {
            if let Some(fields) = node.as_object_mut() {
                remap_list(fields.get_mut("children"), &node_map);
                match fields.get("skin").and_then(|skin| remap(skin, &skin_map)) {
                    Some(skin) => {
                        fields.insert("skin".into(), json!(skin));
                    }
                    None => {
                        fields.remove("skin");
                    }
                }
            }
            node
        })
        .collect::<Vec<_>>();
    root.insert("nodes".into(), Value::Array(kept_nodes));

    if let Some(Value::Array(scenes)) = root.get_mut("scenes") {
        for scene in scenes.iter_mut() {
            remap_list(scene.get_mut("nodes"), &node_map);
        }
    }

    if let Some(Value::Array(animations)) = root.get_mut("animations") {
        for animation in animations.iter_mut() {
            if let Some(Value::Array(channels)) = animation.get_mut("channels") {
                channels.retain_mut(|channel| {
                    let Some(node) = channel["target"].get_mut("node") else {
                        return true;
                    };
                    match remap(node, &node_map) {
                        Some(index) => {
                            *node = json!(index);
                            true
                        }
                        None => false,
                    }
                });
            }
        }
        animations.retain(|animation| {
            animation
                .get("channels")
                .and_then(Value::as_array)
                .is_some_and(|channels| !channels.is_empty())
        });
    }

    // Arrays that became empty are removed; glTF forbids empty index lists.
    for key in ["nodes", "skins", "animations"] {
        if root.get(key).and_then(Value::as_array).is_some_and(Vec::is_empty) {
            root.remove(key);
        }
    }
    if let Some(Value::Array(scenes)) = root.get_mut("scenes") {
        for scene in scenes.iter_mut().filter_map(Value::as_object_mut) {
            if scene.get("nodes").and_then(Value::as_array).is_some_and(Vec::is_empty) {
                scene.remove("nodes");
            }
        }
    }
    for node in root
        .get_mut("nodes")
        .and_then(Value::as_array_mut)
        .into_iter()
        .flatten()
        .filter_map(Value::as_object_mut)
    {
        if node.get("children").and_then(Value::as_array).is_some_and(Vec::is_empty) {
            node.remove("children");
        }
    }
}

fn child_indices(node: &Value) -> impl Iterator<Item = usize> + '_ {
    node.get("children")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(Value::as_u64)
        .map(|index| index as usize)
}

/// Old index to new index, for the entries that are kept.
fn index_map(keep: &[bool]) -> Vec<Option<usize>> {
    let mut next = 0;
    keep.iter()
        .map(|&keep| {
            keep.then(|| {
                next += 1;
                next - 1
            })
        })
        .collect()
}

fn remap(index: &Value, map: &[Option<usize>]) -> Option<usize> {
    index
        .as_u64()
        .and_then(|index| map.get(index as usize).copied().flatten())
}

fn remap_list(list: Option<&mut Value>, map: &[Option<usize>]) {
    if let Some(Value::Array(items)) = list {
        *items = items
            .iter()
            .filter_map(|item| remap(item, map))
            .map(|index| json!(index))
            .collect();
    }
}
