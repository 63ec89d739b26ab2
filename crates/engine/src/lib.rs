pub mod app;
pub mod assets;
pub mod net;
pub mod world;

pub use app::{
    run_app, AppError, FrameReport, InputIntent, JumpTuning, MoveDirection, ViewerConfig,
    ViewerKey, ViewerWorld, WorldRenderer,
};
pub use assets::{
    decode_source, AssetError, AssetLoader, InlineAssetLoader, SpriteImage, ThreadedAssetLoader,
};
pub use net::{
    ClientMessage, ConnectionError, LinkEvent, NetworkClient, ProtocolError, ServerLink,
    ServerMessage,
};
pub use world::{
    AvatarAnimationCache, AvatarDef, Camera, CameraController, Facing, Player, PlayerPatch,
    PlayerStateStore, Viewport,
};
