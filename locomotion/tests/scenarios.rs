use std::cell::RefCell;

use cgmath::{vec2, vec3, Deg, InnerSpace, Quaternion, Rotation3, Vector3, Zero};
use locomotion::{
    climb::Hand,
    config::{LocomotionConfig, TargetingMode},
    math::{Pose, UP},
    nav_mesh::NavMesh,
    physics::RapierScene,
    recording::{RecordingFade, RecordingHaptics, RecordingVignetteSink},
    services::{BallisticPathService, CollisionMask, Impact, PathPrediction, PathQuery},
    vignette::PerspectiveProjection,
    FrameInput, InputEvent, MovementMode, OverlapObject, PoseWriter, Services, TargetOutcome,
    TeleportPhase, VrAvatar,
};

const AVATAR: u64 = 100;
const LADDER: u64 = 7;
const RAIL: u64 = 8;

/// Ballistic service returning whatever path the test scripted last
#[derive(Default)]
struct ScriptedBallistics {
    next: RefCell<Option<PathPrediction>>,
}

impl ScriptedBallistics {
    fn land_at(point: Vector3<f32>) -> Self {
        let scripted = ScriptedBallistics::default();
        scripted.set(Some(PathPrediction {
            points: vec![vec3(0.0, 0.0, 150.0), (point + vec3(0.0, 0.0, 150.0)) * 0.5, point],
            impact: Some(Impact {
                point,
                normal: UP,
                actor: Some(1),
            }),
        }));
        scripted
    }

    fn set(&self, prediction: Option<PathPrediction>) {
        *self.next.borrow_mut() = prediction;
    }
}

impl BallisticPathService for ScriptedBallistics {
    fn predict(&self, _query: &PathQuery) -> Option<PathPrediction> {
        self.next.borrow().clone()
    }
}

fn projection() -> PerspectiveProjection {
    PerspectiveProjection::new(Deg(90.0), vec2(1440.0, 1600.0))
}

fn floor_scene() -> RapierScene {
    let mut scene = RapierScene::new();
    let floor = vec3(2000.0, 2000.0, 10.0);
    let wall = vec3(20.0, 200.0, 100.0);
    scene.add_box(1, vec3(0.0, 0.0, -10.0), floor, CollisionMask::WORLD_STATIC);
    scene.add_box(2, vec3(400.0, 0.0, 100.0), wall, CollisionMask::WORLD_STATIC);
    scene.refresh();
    scene
}

fn spawn(config: LocomotionConfig) -> VrAvatar {
    VrAvatar::new(config, AVATAR, Pose::from_position(vec3(0.0, 0.0, 90.0))).unwrap()
}

fn with_events(events: Vec<InputEvent>) -> FrameInput {
    FrameInput {
        events,
        ..FrameInput::default()
    }
}

#[test]
fn teleport_settles_half_height_above_marker_after_fade() {
    let mut avatar = spawn(LocomotionConfig::default());
    let ballistics = ScriptedBallistics::land_at(vec3(10.0, 0.0, 0.0));
    let nav = NavMesh::square(vec3(0.0, 0.0, 0.0), 500.0).unwrap();
    let scene = floor_scene();
    let projection = projection();
    let mut fade = RecordingFade::default();
    let mut services = Services {
        ballistic: &ballistics,
        nav: &nav,
        trace: &scene,
        projection: &projection,
        fade: Some(&mut fade),
        haptics: None,
        post_process: None,
    };

    let report = avatar.tick(0.1, &FrameInput::default(), &mut services);
    assert!(matches!(report.target, TargetOutcome::Valid { .. }));
    assert_eq!(avatar.teleport().marker().pose.position, vec3(10.0, 0.0, 0.0));

    avatar.tick(0.1, &with_events(vec![InputEvent::TeleportTrigger]), &mut services);
    assert_eq!(avatar.teleport().phase(), TeleportPhase::Fading);

    // A second trigger mid-fade is ignored
    avatar.tick(0.1, &with_events(vec![InputEvent::TeleportTrigger]), &mut services);
    assert_eq!(avatar.timer().pending_count(), 1);
    assert_eq!(avatar.body().position(), vec3(0.0, 0.0, 90.0));

    let mut relocated = None;
    for _ in 0..10 {
        let report = avatar.tick(0.1, &FrameInput::default(), &mut services);
        if let Some(position) = report.relocated {
            assert_eq!(report.pose_writer, Some(PoseWriter::Teleport));
            relocated = Some(position);
            break;
        }
    }

    assert_eq!(relocated, Some(vec3(10.0, 0.0, 90.0)));
    assert_eq!(avatar.body().position(), vec3(10.0, 0.0, 90.0));
    assert_eq!(avatar.body().velocity(), Vector3::zero());
    assert_eq!(avatar.teleport().phase(), TeleportPhase::Idle);

    let alphas: Vec<(f32, f32)> = fade.calls.iter().map(|c| (c.from_alpha, c.to_alpha)).collect();
    assert_eq!(alphas, vec![(0.0, 1.0), (1.0, 0.0)]);
}

#[test]
fn destination_hidden_when_surface_snap_fails() {
    let mut avatar = spawn(LocomotionConfig::default());
    let ballistics = ScriptedBallistics::land_at(vec3(10.0, 0.0, 0.0));
    let nav = NavMesh::square(vec3(0.0, 0.0, 0.0), 500.0).unwrap();
    let off_mesh = NavMesh::default();
    let scene = floor_scene();
    let projection = projection();

    let mut services = Services {
        ballistic: &ballistics,
        nav: &nav,
        trace: &scene,
        projection: &projection,
        fade: None,
        haptics: None,
        post_process: None,
    };
    avatar.tick(0.016, &FrameInput::default(), &mut services);
    assert!(avatar.teleport().marker().visible);

    services.nav = &off_mesh;
    let report = avatar.tick(0.016, &FrameInput::default(), &mut services);
    assert_eq!(report.target, TargetOutcome::OffNavigableSurface);
    assert!(!avatar.teleport().marker().visible);
    // The arc is still drawn even though there is nowhere to land
    assert_eq!(avatar.teleport().pool().visible_count(), 2);
}

#[test]
fn segment_pool_follows_path_and_keeps_slots() {
    let mut avatar = spawn(LocomotionConfig::default());
    let ballistics = ScriptedBallistics::default();
    let nav = NavMesh::square(vec3(0.0, 0.0, 0.0), 500.0).unwrap();
    let scene = floor_scene();
    let projection = projection();
    let mut services = Services {
        ballistic: &ballistics,
        nav: &nav,
        trace: &scene,
        projection: &projection,
        fade: None,
        haptics: None,
        post_process: None,
    };

    ballistics.set(Some(PathPrediction {
        points: vec![vec3(0.0, 0.0, 0.0), vec3(1.0, 0.0, 0.0), vec3(2.0, 0.0, 0.0)],
        impact: None,
    }));
    avatar.tick(0.016, &FrameInput::default(), &mut services);
    let pool = avatar.teleport().pool();
    assert_eq!(pool.visible_count(), 2);
    assert_eq!(pool.live_count(), 2);
    assert!(!avatar.teleport().marker().visible);

    ballistics.set(Some(PathPrediction::default()));
    avatar.tick(0.016, &FrameInput::default(), &mut services);
    let pool = avatar.teleport().pool();
    assert_eq!(pool.visible_count(), 0);
    assert_eq!(pool.live_count(), 2);
    assert!(pool.segments().iter().all(|s| !s.visible));

    // Service failure behaves like an empty path
    ballistics.set(None);
    avatar.tick(0.016, &FrameInput::default(), &mut services);
    assert_eq!(avatar.teleport().pool().live_count(), 2);
}

#[test]
fn line_targeting_rejects_walls() {
    let mut config = LocomotionConfig::default();
    config.teleport.targeting = TargetingMode::Line;
    let mut avatar = spawn(config);
    let ballistics = ScriptedBallistics::default();
    let nav = NavMesh::square(vec3(0.0, 0.0, 0.0), 1000.0).unwrap();
    let scene = floor_scene();
    let projection = projection();
    let mut services = Services {
        ballistic: &ballistics,
        nav: &nav,
        trace: &scene,
        projection: &projection,
        fade: None,
        haptics: None,
        post_process: None,
    };

    // Looking 45 degrees down from eye height hits the floor
    let looking_down = FrameInput {
        hmd: Pose::new(vec3(0.0, 0.0, 60.0), Quaternion::from_angle_y(Deg(45.0))),
        ..FrameInput::default()
    };
    let report = avatar.tick(0.016, &looking_down, &mut services);
    match report.target {
        TargetOutcome::Valid { point, normal } => {
            assert!((point - vec3(150.0, 0.0, 0.0)).magnitude() < 0.5);
            assert!((normal - UP).magnitude() < 1.0e-3);
        }
        other => panic!("expected a valid target, got {:?}", other),
    }
    assert_eq!(avatar.teleport().pool().visible_count(), 1);

    // Looking straight ahead hits the wall face
    let looking_ahead = FrameInput {
        hmd: Pose::from_position(vec3(0.0, 0.0, 60.0)),
        ..FrameInput::default()
    };
    let report = avatar.tick(0.016, &looking_ahead, &mut services);
    assert_eq!(report.target, TargetOutcome::SteepSurface);
    assert!(!avatar.teleport().marker().visible);
}

#[test]
fn overlap_with_climbable_pulses_once() {
    let mut avatar = spawn(LocomotionConfig::default());
    let ballistics = ScriptedBallistics::default();
    let nav = NavMesh::default();
    let scene = floor_scene();
    let projection = projection();
    let mut haptics = RecordingHaptics::default();
    let mut services = Services {
        ballistic: &ballistics,
        nav: &nav,
        trace: &scene,
        projection: &projection,
        fade: None,
        haptics: Some(&mut haptics),
        post_process: None,
    };

    avatar.tick(
        0.016,
        &with_events(vec![
            InputEvent::OverlapBegin {
                hand: Hand::Left,
                object: OverlapObject::new(RAIL, &["Metal"]),
            },
            InputEvent::OverlapBegin {
                hand: Hand::Left,
                object: OverlapObject::new(LADDER, &["Climbable"]),
            },
            // Already able to climb, no second pulse
            InputEvent::OverlapBegin {
                hand: Hand::Left,
                object: OverlapObject::new(LADDER + 10, &["Climbable"]),
            },
        ]),
        &mut services,
    );
    assert!(avatar.climb().hand(Hand::Left).can_climb());
    assert!(!avatar.climb().hand(Hand::Right).can_climb());

    assert_eq!(haptics.count_for(Hand::Left), 1);
    assert_eq!(haptics.count_for(Hand::Right), 0);
}

#[test]
fn overlap_without_haptics_still_enables_climbing() {
    let mut avatar = spawn(LocomotionConfig::default());
    let ballistics = ScriptedBallistics::default();
    let nav = NavMesh::default();
    let scene = floor_scene();
    let projection = projection();
    let mut services = Services {
        ballistic: &ballistics,
        nav: &nav,
        trace: &scene,
        projection: &projection,
        fade: None,
        haptics: None,
        post_process: None,
    };

    avatar.tick(
        0.016,
        &with_events(vec![InputEvent::OverlapBegin {
            hand: Hand::Right,
            object: OverlapObject::new(LADDER, &["Climbable"]),
        }]),
        &mut services,
    );
    assert!(avatar.climb().hand(Hand::Right).can_climb());
}

#[test]
fn gripping_second_hand_takes_over_and_climbing_moves_body() {
    let mut avatar = spawn(LocomotionConfig::default());
    let ballistics = ScriptedBallistics::default();
    let nav = NavMesh::default();
    let scene = floor_scene();
    let projection = projection();
    let mut sink = RecordingVignetteSink::default();
    let mut services = Services {
        ballistic: &ballistics,
        nav: &nav,
        trace: &scene,
        projection: &projection,
        fade: None,
        haptics: None,
        post_process: Some(&mut sink),
    };

    let hands = [
        Pose::from_position(vec3(20.0, -20.0, 50.0)),
        Pose::from_position(vec3(20.0, 20.0, 50.0)),
    ];
    let overlap_both = FrameInput {
        hands,
        events: vec![
            InputEvent::OverlapBegin {
                hand: Hand::Left,
                object: OverlapObject::new(LADDER, &["Climbable"]),
            },
            InputEvent::OverlapBegin {
                hand: Hand::Right,
                object: OverlapObject::new(LADDER, &["Climbable"]),
            },
            InputEvent::Grip(Hand::Left),
        ],
        ..FrameInput::default()
    };
    avatar.tick(0.016, &overlap_both, &mut services);
    assert_eq!(avatar.climb().climbing_hand(), Some(Hand::Left));
    assert_eq!(avatar.body().movement_mode(), MovementMode::Flying);

    // Pulling the left hand down 10 lifts the body 10
    let pulled = [
        Pose::from_position(vec3(20.0, -20.0, 40.0)),
        hands[1],
    ];
    let pull = FrameInput {
        hands: pulled,
        ..FrameInput::default()
    };
    let report = avatar.tick(0.05, &pull, &mut services);
    assert_eq!(report.pose_writer, Some(PoseWriter::Climb));
    assert!((avatar.body().position() - vec3(0.0, 0.0, 100.0)).magnitude() < 1.0e-3);
    assert!((avatar.body().velocity() - vec3(0.0, 0.0, 200.0)).magnitude() < 1.0e-2);

    let takeover = FrameInput {
        hands: pulled,
        events: vec![InputEvent::Grip(Hand::Right)],
        ..FrameInput::default()
    };
    avatar.tick(0.016, &takeover, &mut services);
    assert!(!avatar.climb().hand(Hand::Left).is_climbing());
    assert!(avatar.climb().hand(Hand::Right).is_climbing());
    assert_eq!(avatar.body().movement_mode(), MovementMode::Flying);

    // Walking input is ignored while climbing
    let walk = FrameInput {
        hands: pulled,
        forward_axis: 1.0,
        ..FrameInput::default()
    };
    let before = avatar.body().position();
    avatar.tick(0.016, &walk, &mut services);
    assert_eq!(avatar.body().position(), before);

    avatar.tick(0.016, &with_release(pulled, Hand::Right), &mut services);
    assert_eq!(avatar.climb().climbing_hand(), None);
    assert_eq!(avatar.body().movement_mode(), MovementMode::Grounded);
}

fn with_release(hands: [Pose; 2], hand: Hand) -> FrameInput {
    FrameInput {
        hands,
        events: vec![InputEvent::Release(hand)],
        ..FrameInput::default()
    }
}

#[test]
fn vignette_centres_when_still_and_narrows_with_speed() {
    let mut avatar = spawn(LocomotionConfig::default());
    let ballistics = ScriptedBallistics::default();
    let nav = NavMesh::default();
    let scene = floor_scene();
    let projection = projection();
    let mut sink = RecordingVignetteSink::default();
    let mut services = Services {
        ballistic: &ballistics,
        nav: &nav,
        trace: &scene,
        projection: &projection,
        fade: None,
        haptics: None,
        post_process: Some(&mut sink),
    };

    let still = avatar.tick(0.016, &FrameInput::default(), &mut services).vignette.unwrap();
    assert_eq!(still.focal_point, vec2(0.5, 0.5));
    assert_eq!(still.radius, 1.0);

    let strafing = FrameInput {
        right_axis: 1.0,
        ..FrameInput::default()
    };
    let moving = avatar.tick(0.1, &strafing, &mut services).vignette.unwrap();
    assert!(moving.radius < still.radius);
    // Sideways motion is behind the view plane, so the focal point falls back to centre
    assert_eq!(moving.focal_point, vec2(0.5, 0.5));

    assert_eq!(sink.pushed.len(), 2);
}
