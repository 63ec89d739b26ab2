use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use serde::Deserialize;
use tracing::{debug, warn};

use crate::assets::{AssetLoader, LoadResult, LoadTicket, SpriteImage};

use super::players::Facing;

/// Stored animation directions. West is drawn as a mirrored east frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameSet {
    North,
    South,
    East,
}

impl FrameSet {
    pub const ALL: [FrameSet; 3] = [FrameSet::North, FrameSet::South, FrameSet::East];
}

impl Facing {
    pub fn frame_set(self) -> (FrameSet, bool) {
        match self {
            Facing::North => (FrameSet::North, false),
            Facing::South => (FrameSet::South, false),
            Facing::East => (FrameSet::East, false),
            Facing::West => (FrameSet::East, true),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct AvatarFrameSources {
    #[serde(default)]
    pub north: Vec<String>,
    #[serde(default)]
    pub south: Vec<String>,
    #[serde(default)]
    pub east: Vec<String>,
}

impl AvatarFrameSources {
    fn get(&self, set: FrameSet) -> &[String] {
        match set {
            FrameSet::North => &self.north,
            FrameSet::South => &self.south,
            FrameSet::East => &self.east,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct AvatarDef {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub frames: AvatarFrameSources,
}

#[derive(Debug, Clone, Default)]
enum FrameSlot {
    #[default]
    Empty,
    Pending,
    Loaded(Arc<SpriteImage>),
    Failed,
}

impl FrameSlot {
    fn needs_request(&self) -> bool {
        matches!(self, FrameSlot::Empty | FrameSlot::Failed)
    }

    fn image(&self) -> Option<&SpriteImage> {
        match self {
            FrameSlot::Loaded(image) => Some(image.as_ref()),
            _ => None,
        }
    }
}

#[derive(Debug, Default)]
struct AvatarFrames {
    north: Vec<FrameSlot>,
    south: Vec<FrameSlot>,
    east: Vec<FrameSlot>,
}

impl AvatarFrames {
    fn slots(&self, set: FrameSet) -> &[FrameSlot] {
        match set {
            FrameSet::North => &self.north,
            FrameSet::South => &self.south,
            FrameSet::East => &self.east,
        }
    }

    fn slots_mut(&mut self, set: FrameSet) -> &mut Vec<FrameSlot> {
        match set {
            FrameSet::North => &mut self.north,
            FrameSet::South => &mut self.south,
            FrameSet::East => &mut self.east,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RegistrationBatch(u64);

#[derive(Debug)]
struct PendingFrame {
    avatar: String,
    set: FrameSet,
    index: usize,
    batch: RegistrationBatch,
    source_label: String,
}

#[derive(Debug, Clone, Copy)]
pub struct ResolvedFrame<'a> {
    pub image: Option<&'a SpriteImage>,
    pub mirrored: bool,
}

impl<'a> ResolvedFrame<'a> {
    fn none() -> Self {
        Self {
            image: None,
            mirrored: false,
        }
    }
}

pub struct AvatarAnimationCache {
    loader: Box<dyn AssetLoader>,
    avatars: HashMap<String, AvatarFrames>,
    pending: HashMap<LoadTicket, PendingFrame>,
    outstanding_by_batch: HashMap<RegistrationBatch, usize>,
    settled_without_loads: Vec<RegistrationBatch>,
    warned_sources: HashSet<String>,
    completed_scratch: Vec<LoadResult>,
    next_ticket: u64,
    next_batch: u64,
}

impl AvatarAnimationCache {
    pub fn new(loader: Box<dyn AssetLoader>) -> Self {
        Self {
            loader,
            avatars: HashMap::new(),
            pending: HashMap::new(),
            outstanding_by_batch: HashMap::new(),
            settled_without_loads: Vec::new(),
            warned_sources: HashSet::new(),
            completed_scratch: Vec::new(),
            next_ticket: 0,
            next_batch: 0,
        }
    }

    /// Requests every frame not already loaded or in flight. The returned batch
    /// is reported by `pump` once each of its loads has either succeeded or failed.
    pub fn register_avatars<I>(&mut self, defs: I) -> RegistrationBatch
    where
        I: IntoIterator<Item = AvatarDef>,
    {
        let batch = RegistrationBatch(self.next_batch);
        self.next_batch += 1;
        let mut requested = 0usize;

        for def in defs {
            if def.name.is_empty() {
                warn!("avatar_definition_without_name");
                continue;
            }
            let frames = self.avatars.entry(def.name.clone()).or_default();
            for set in FrameSet::ALL {
                let sources = def.frames.get(set);
                let slots = frames.slots_mut(set);
                if slots.len() < sources.len() {
                    slots.resize_with(sources.len(), FrameSlot::default);
                }
                for (index, source) in sources.iter().enumerate() {
                    if !slots[index].needs_request() {
                        continue;
                    }
                    slots[index] = FrameSlot::Pending;
                    let ticket = LoadTicket(self.next_ticket);
                    self.next_ticket += 1;
                    self.pending.insert(
                        ticket,
                        PendingFrame {
                            avatar: def.name.clone(),
                            set,
                            index,
                            batch,
                            source_label: source_label(source),
                        },
                    );
                    self.loader.submit(ticket, source.clone());
                    requested += 1;
                }
            }
        }

        if requested == 0 {
            self.settled_without_loads.push(batch);
        } else {
            self.outstanding_by_batch.insert(batch, requested);
        }
        debug!(batch = batch.0, requested, "avatar_registration_started");
        batch
    }

    /// Applies finished loads and returns the batches that settled since the last call.
    pub fn pump(&mut self) -> Vec<RegistrationBatch> {
        let mut settled = std::mem::take(&mut self.settled_without_loads);
        self.completed_scratch.clear();
        self.loader.drain_completed(&mut self.completed_scratch);

        for result in self.completed_scratch.drain(..) {
            let Some(pending) = self.pending.remove(&result.ticket) else {
                continue;
            };
            let slot = match result.outcome {
                Ok(image) => FrameSlot::Loaded(Arc::new(image)),
                Err(error) => {
                    if self.warned_sources.insert(pending.source_label.clone()) {
                        warn!(
                            avatar = %pending.avatar,
                            direction = ?pending.set,
                            frame = pending.index,
                            source = %pending.source_label,
                            error = %error,
                            "avatar_frame_load_failed"
                        );
                    }
                    FrameSlot::Failed
                }
            };
            if let Some(target) = self
                .avatars
                .get_mut(&pending.avatar)
                .and_then(|frames| frames.slots_mut(pending.set).get_mut(pending.index))
            {
                *target = slot;
            }

            if let Some(outstanding) = self.outstanding_by_batch.get_mut(&pending.batch) {
                *outstanding = outstanding.saturating_sub(1);
                if *outstanding == 0 {
                    self.outstanding_by_batch.remove(&pending.batch);
                    settled.push(pending.batch);
                }
            }
        }

        for batch in &settled {
            debug!(batch = batch.0, "avatar_registration_settled");
        }
        settled
    }

    pub fn is_settled(&self, batch: RegistrationBatch) -> bool {
        !self.outstanding_by_batch.contains_key(&batch)
    }

    pub fn frame_for(
        &self,
        avatar_name: &str,
        facing: Facing,
        frame_index: u32,
    ) -> ResolvedFrame<'_> {
        let (set, mirrored) = facing.frame_set();
        let Some(frames) = self.avatars.get(avatar_name) else {
            return ResolvedFrame::none();
        };
        let slots = frames.slots(set);
        if slots.is_empty() {
            return ResolvedFrame::none();
        }
        let index = frame_index as usize % slots.len();
        ResolvedFrame {
            image: slots[index].image(),
            mirrored,
        }
    }

    pub fn contains(&self, avatar_name: &str) -> bool {
        self.avatars.contains_key(avatar_name)
    }

    pub fn pending_loads(&self) -> usize {
        self.pending.len()
    }
}

fn source_label(source: &str) -> String {
    const MAX_LABEL_CHARS: usize = 48;
    if source.chars().count() <= MAX_LABEL_CHARS {
        return source.to_string();
    }
    let head: String = source.chars().take(MAX_LABEL_CHARS).collect();
    format!("{head}...")
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::assets::{encode_png_data_url, AssetError, InlineAssetLoader};

    /// Holds submissions until the test completes them explicitly.
    #[derive(Default)]
    struct ManualLoaderState {
        submitted: Vec<(LoadTicket, String)>,
        completed: Vec<LoadResult>,
    }

    #[derive(Clone, Default)]
    struct ManualLoader(Rc<RefCell<ManualLoaderState>>);

    impl ManualLoader {
        fn complete_all(&self, image: SpriteImage) {
            let mut state = self.0.borrow_mut();
            let submitted = std::mem::take(&mut state.submitted);
            for (ticket, _) in submitted {
                state.completed.push(LoadResult {
                    ticket,
                    outcome: Ok(image.clone()),
                });
            }
        }

        fn fail_all(&self) {
            let mut state = self.0.borrow_mut();
            let submitted = std::mem::take(&mut state.submitted);
            for (ticket, source) in submitted {
                state.completed.push(LoadResult {
                    ticket,
                    outcome: Err(AssetError::UnsupportedSource(source)),
                });
            }
        }

        fn submitted_count(&self) -> usize {
            self.0.borrow().submitted.len()
        }
    }

    impl AssetLoader for ManualLoader {
        fn submit(&mut self, ticket: LoadTicket, source: String) {
            self.0.borrow_mut().submitted.push((ticket, source));
        }

        fn drain_completed(&mut self, out: &mut Vec<LoadResult>) {
            out.append(&mut self.0.borrow_mut().completed);
        }
    }

    fn frame_url(shade: u8) -> String {
        encode_png_data_url(&SpriteImage::solid(2, 3, [shade, shade, shade, 255])).expect("url")
    }

    fn def(name: &str, north: usize, south: usize, east: usize) -> AvatarDef {
        AvatarDef {
            name: name.to_string(),
            frames: AvatarFrameSources {
                north: (0..north).map(|i| frame_url(10 + i as u8)).collect(),
                south: (0..south).map(|i| frame_url(50 + i as u8)).collect(),
                east: (0..east).map(|i| frame_url(90 + i as u8)).collect(),
            },
        }
    }

    fn loaded_cache(defs: Vec<AvatarDef>) -> AvatarAnimationCache {
        let mut cache = AvatarAnimationCache::new(Box::new(InlineAssetLoader::new()));
        let batch = cache.register_avatars(defs);
        assert_eq!(cache.pump(), vec![batch]);
        cache
    }

    #[test]
    fn frame_index_wraps_modulo_set_length() {
        let cache = loaded_cache(vec![def("knight", 0, 3, 2)]);
        for i in 0..9u32 {
            let expected = cache.frame_for("knight", Facing::South, i % 3);
            let actual = cache.frame_for("knight", Facing::South, i);
            assert!(std::ptr::eq(
                actual.image.expect("image"),
                expected.image.expect("image")
            ));
        }
        let first = cache.frame_for("knight", Facing::South, 0).image.expect("image");
        assert_eq!(first.pixel(0, 0), Some([50, 50, 50, 255]));
        let wrapped = cache.frame_for("knight", Facing::South, 4).image.expect("image");
        assert_eq!(wrapped.pixel(0, 0), Some([51, 51, 51, 255]));
    }

    #[test]
    fn west_resolves_to_mirrored_east() {
        let cache = loaded_cache(vec![def("knight", 1, 1, 2)]);
        for i in 0..4u32 {
            let west = cache.frame_for("knight", Facing::West, i);
            let east = cache.frame_for("knight", Facing::East, i);
            assert!(west.mirrored);
            assert!(!east.mirrored);
            assert!(std::ptr::eq(
                west.image.expect("west"),
                east.image.expect("east")
            ));
        }
    }

    #[test]
    fn empty_or_missing_sets_resolve_to_no_image() {
        let cache = loaded_cache(vec![def("knight", 0, 1, 1)]);
        assert!(cache.frame_for("knight", Facing::North, 5).image.is_none());
        assert!(cache.frame_for("unknown", Facing::South, 0).image.is_none());
        let no_east = loaded_cache(vec![def("south_only", 0, 1, 0)]);
        assert!(no_east.frame_for("south_only", Facing::West, 2).image.is_none());
    }

    #[test]
    fn batch_settles_only_after_every_load_finishes() {
        let loader = ManualLoader::default();
        let mut cache = AvatarAnimationCache::new(Box::new(loader.clone()));
        let batch = cache.register_avatars(vec![def("knight", 1, 1, 1)]);
        assert_eq!(loader.submitted_count(), 3);
        assert!(!cache.is_settled(batch));
        assert!(cache.pump().is_empty());
        assert!(cache.frame_for("knight", Facing::South, 0).image.is_none());

        loader.complete_all(SpriteImage::solid(1, 1, [1, 2, 3, 255]));
        assert_eq!(cache.pump(), vec![batch]);
        assert!(cache.is_settled(batch));
        assert!(cache.frame_for("knight", Facing::North, 0).image.is_some());
    }

    #[test]
    fn failed_loads_still_settle_and_leave_empty_slot() {
        let loader = ManualLoader::default();
        let mut cache = AvatarAnimationCache::new(Box::new(loader.clone()));
        let batch = cache.register_avatars(vec![def("knight", 0, 2, 0)]);
        loader.fail_all();
        assert_eq!(cache.pump(), vec![batch]);
        assert!(cache.frame_for("knight", Facing::South, 1).image.is_none());
        assert_eq!(cache.pending_loads(), 0);
    }

    #[test]
    fn reregistration_skips_loaded_and_in_flight_frames() {
        let loader = ManualLoader::default();
        let mut cache = AvatarAnimationCache::new(Box::new(loader.clone()));
        cache.register_avatars(vec![def("knight", 1, 1, 0)]);
        assert_eq!(loader.submitted_count(), 2);

        let second = cache.register_avatars(vec![def("knight", 1, 2, 0)]);
        assert_eq!(loader.submitted_count(), 3);
        loader.complete_all(SpriteImage::solid(1, 1, [0, 0, 0, 255]));
        let settled = cache.pump();
        assert!(settled.contains(&second));

        let third = cache.register_avatars(vec![def("knight", 1, 2, 0)]);
        assert_eq!(loader.submitted_count(), 0);
        assert_eq!(cache.pump(), vec![third]);
    }

    #[test]
    fn nameless_definitions_are_skipped() {
        let mut cache = AvatarAnimationCache::new(Box::new(InlineAssetLoader::new()));
        let batch = cache.register_avatars(vec![def("", 1, 1, 1)]);
        assert_eq!(cache.pump(), vec![batch]);
        assert!(!cache.contains(""));
    }

    #[test]
    fn avatar_def_deserializes_with_missing_directions() {
        let parsed: AvatarDef =
            serde_json::from_str(r#"{"name":"mage","frames":{"south":["a.png"]}}"#)
                .expect("def");
        assert_eq!(parsed.frames.south, vec!["a.png".to_string()]);
        assert!(parsed.frames.north.is_empty());
        assert!(parsed.frames.east.is_empty());
    }
}
