mod avatars;
mod camera;
mod players;

pub use avatars::{
    AvatarAnimationCache, AvatarDef, AvatarFrameSources, FrameSet, RegistrationBatch,
    ResolvedFrame,
};
pub use camera::{centered_camera, Camera, CameraController, PixelSize, Viewport};
pub use players::{Facing, MergeOutcome, Player, PlayerPatch, PlayerStateStore};
