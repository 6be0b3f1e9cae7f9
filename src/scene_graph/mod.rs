pub mod mesh;
pub mod object3d;
pub mod scene;

pub use mesh::Mesh;
pub use object3d::{ObjectType, SceneObject, Tags};
pub use scene::{GeometryHost, Scene};
