use std::path::Path;

use anyhow::{Context, Result};
use cgmath::{vec3, Deg, Quaternion, Rotation3, Vector3};
use serde::Deserialize;

use locomotion::{
    nav_mesh::{NavMesh, NavPolygon},
    physics::RapierScene,
    services::{ActorId, CollisionMask},
    FrameInput, Hand, InputEvent, OverlapObject, Pose,
};

/// A scripted run: static geometry, a nav mesh and a list of input frames.
#[derive(Debug, Deserialize)]
pub struct Scenario {
    #[serde(default = "default_dt")]
    pub dt: f32,
    #[serde(default = "default_actor")]
    pub actor_id: ActorId,
    pub start: [f32; 3],
    #[serde(default)]
    pub boxes: Vec<SceneBox>,
    #[serde(default)]
    pub nav_polygons: Vec<Vec<[f32; 3]>>,
    pub frames: Vec<ScenarioFrame>,
}

fn default_dt() -> f32 {
    1.0 / 72.0
}

fn default_actor() -> ActorId {
    1000
}

#[derive(Debug, Deserialize)]
pub struct SceneBox {
    pub actor: ActorId,
    pub center: [f32; 3],
    pub half_extents: [f32; 3],
    #[serde(default = "default_channels")]
    pub channels: u32,
}

fn default_channels() -> u32 {
    CollisionMask::WORLD_STATIC.bits()
}

/// A tracked device pose, in tracking space
#[derive(Clone, Copy, Debug, Deserialize)]
pub struct TrackedPose {
    pub position: [f32; 3],
    #[serde(default)]
    pub yaw_deg: f32,
    #[serde(default)]
    pub pitch_deg: f32,
}

impl TrackedPose {
    fn to_pose(self) -> Pose {
        // Positive pitch looks down
        let yaw = Quaternion::from_angle_z(Deg(self.yaw_deg));
        let pitch = Quaternion::from_angle_y(Deg(self.pitch_deg));
        let orientation = yaw * pitch;
        Pose::new(to_vec(self.position), orientation)
    }
}

/// Input held for `repeat` ticks. Events fire on the first of them.
#[derive(Debug, Deserialize)]
pub struct ScenarioFrame {
    #[serde(default = "default_repeat")]
    pub repeat: usize,
    #[serde(default)]
    pub forward_axis: f32,
    #[serde(default)]
    pub right_axis: f32,
    #[serde(default = "default_hmd")]
    pub hmd: TrackedPose,
    #[serde(default = "default_hands")]
    pub hands: [TrackedPose; 2],
    #[serde(default)]
    pub events: Vec<ScenarioEvent>,
}

fn default_repeat() -> usize {
    1
}

fn default_hmd() -> TrackedPose {
    TrackedPose {
        position: [0.0, 0.0, 70.0],
        yaw_deg: 0.0,
        pitch_deg: 0.0,
    }
}

fn default_hands() -> [TrackedPose; 2] {
    let hand = |y| TrackedPose {
        position: [20.0, y, 30.0],
        yaw_deg: 0.0,
        pitch_deg: -20.0,
    };
    [hand(-20.0), hand(20.0)]
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ScenarioEvent {
    TeleportTrigger,
    Grip { hand: Hand },
    Release { hand: Hand },
    OverlapBegin {
        hand: Hand,
        actor: ActorId,
        #[serde(default)]
        tags: Vec<String>,
    },
    OverlapEnd { hand: Hand, actor: ActorId },
}

impl ScenarioEvent {
    fn to_input(&self) -> InputEvent {
        match self {
            ScenarioEvent::TeleportTrigger => InputEvent::TeleportTrigger,
            ScenarioEvent::Grip { hand } => InputEvent::Grip(*hand),
            ScenarioEvent::Release { hand } => InputEvent::Release(*hand),
            ScenarioEvent::OverlapBegin { hand, actor, tags } => InputEvent::OverlapBegin {
                hand: *hand,
                object: OverlapObject {
                    actor: *actor,
                    tags: tags.clone(),
                },
            },
            ScenarioEvent::OverlapEnd { hand, actor } => InputEvent::OverlapEnd {
                hand: *hand,
                actor: *actor,
            },
        }
    }
}

impl ScenarioFrame {
    /// Input for the `index`th tick of this frame
    pub fn input(&self, index: usize) -> FrameInput {
        let events = if index == 0 {
            self.events.iter().map(ScenarioEvent::to_input).collect()
        } else {
            Vec::new()
        };
        FrameInput {
            forward_axis: self.forward_axis,
            right_axis: self.right_axis,
            hmd: self.hmd.to_pose(),
            hands: [self.hands[0].to_pose(), self.hands[1].to_pose()],
            events,
        }
    }
}

impl Scenario {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read scenario {}", path.display()))?;
        let scenario: Scenario = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse scenario {}", path.display()))?;
        if !scenario.dt.is_finite() || scenario.dt <= 0.0 {
            anyhow::bail!("scenario dt must be positive, got {}", scenario.dt);
        }
        Ok(scenario)
    }

    pub fn build_scene(&self) -> RapierScene {
        let mut scene = RapierScene::new();
        for scene_box in &self.boxes {
            scene.add_box(
                scene_box.actor,
                to_vec(scene_box.center),
                to_vec(scene_box.half_extents),
                CollisionMask::from_bits_truncate(scene_box.channels),
            );
        }
        scene.refresh();
        scene
    }

    pub fn build_nav_mesh(&self) -> Result<NavMesh> {
        let polygons = self
            .nav_polygons
            .iter()
            .map(|vertices| NavPolygon {
                vertices: vertices.iter().copied().map(to_vec).collect(),
            })
            .collect();
        NavMesh::new(polygons).context("Invalid nav mesh in scenario")
    }

    pub fn start_pose(&self) -> Pose {
        Pose::from_position(to_vec(self.start))
    }

    pub fn tick_count(&self) -> usize {
        self.frames.iter().map(|f| f.repeat).sum()
    }
}

fn to_vec(v: [f32; 3]) -> Vector3<f32> {
    vec3(v[0], v[1], v[2])
}
