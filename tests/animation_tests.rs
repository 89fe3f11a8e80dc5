//! Animation System Tests
//!
//! Tests for:
//! - KeyframeTrack sampling (exact keys, bracketing, looping, static tracks)
//! - Shortest-path slerp
//! - AnimationMixer stack and crossfade weight
//! - Animator entity lifecycle and blended local transforms

mod common;

use std::f32::consts::FRAC_PI_2;

use glam::{Quat, Vec3};

use common::load_rig;
use skinpose::animation::{
    Animator, AnimatorConfig, KeyFrame, KeyframeTrack, MixerState, slerp_shortest,
};
use skinpose::errors::{Error, ErrorKind};

const EPSILON: f32 = 1e-5;

fn vec_approx(a: Vec3, b: Vec3) -> bool {
    a.abs_diff_eq(b, EPSILON)
}

fn quat_approx(a: Quat, b: Quat) -> bool {
    // q and -q are the same rotation
    a.dot(b).abs() > 1.0 - EPSILON
}

fn walk_track() -> KeyframeTrack<Vec3> {
    KeyframeTrack::new(vec![
        KeyFrame::new(0.0, Vec3::ZERO),
        KeyFrame::new(1.0, Vec3::X),
    ])
    .unwrap()
}

// ============================================================================
// KeyframeTrack Sampling
// ============================================================================

#[test]
fn walk_translation_at_500ms_is_halfway() {
    let value = walk_track().sample(500.0).unwrap();
    assert!(vec_approx(value, Vec3::new(0.5, 0.0, 0.0)), "got {value}");
}

#[test]
fn sampling_at_keyframe_time_returns_its_value() {
    let track = KeyframeTrack::new(vec![
        KeyFrame::new(0.0, Vec3::ZERO),
        KeyFrame::new(0.5, Vec3::Y),
        KeyFrame::new(2.0, Vec3::Z),
    ])
    .unwrap();

    assert!(vec_approx(track.sample(0.0).unwrap(), Vec3::ZERO));
    assert!(vec_approx(track.sample(500.0).unwrap(), Vec3::Y));
}

#[test]
fn sampling_loops_with_track_duration() {
    let track = KeyframeTrack::new(vec![
        KeyFrame::new(0.0, Vec3::ZERO),
        KeyFrame::new(0.4, Vec3::splat(2.0)),
        KeyFrame::new(1.5, Vec3::new(-1.0, 3.0, 0.5)),
    ])
    .unwrap();
    let duration_ms = track.duration() * 1000.0;

    for elapsed in [0.0, 120.0, 400.0, 777.0, 1499.0] {
        let a = track.sample(elapsed).unwrap();
        let b = track.sample(elapsed + duration_ms).unwrap();
        assert!(a.abs_diff_eq(b, 1e-3), "{elapsed}ms: {a} vs {b}");
    }
}

#[test]
fn before_first_keyframe_holds_first_value() {
    let track = KeyframeTrack::new(vec![
        KeyFrame::new(0.5, Vec3::Y),
        KeyFrame::new(1.0, Vec3::Z),
    ])
    .unwrap();

    assert!(vec_approx(track.sample(100.0).unwrap(), Vec3::Y));
}

#[test]
fn single_keyframe_is_static() {
    let track = KeyframeTrack::new(vec![KeyFrame::new(0.3, Vec3::splat(7.0))]).unwrap();
    for elapsed in [0.0, 300.0, 12_345.0] {
        assert_eq!(track.sample(elapsed), Some(Vec3::splat(7.0)));
    }
}

#[test]
fn empty_track_has_no_value() {
    let track = KeyframeTrack::<Vec3>::empty();
    assert_eq!(track.sample(100.0), None);
    assert_eq!(track.duration(), 0.0);
}

#[test]
fn duplicate_timestamps_are_rejected() {
    let err = KeyframeTrack::new(vec![
        KeyFrame::new(0.0, Vec3::ZERO),
        KeyFrame::new(0.0, Vec3::X),
    ])
    .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MalformedAsset);
}

#[test]
fn negative_timestamps_are_rejected() {
    assert!(KeyframeTrack::new(vec![KeyFrame::new(-1.0, Vec3::ZERO)]).is_err());
}

// ============================================================================
// Rotation Interpolation
// ============================================================================

#[test]
fn rotation_track_uses_slerp() {
    let track = KeyframeTrack::new(vec![
        KeyFrame::new(0.0, Quat::IDENTITY),
        KeyFrame::new(1.0, Quat::from_rotation_y(FRAC_PI_2)),
    ])
    .unwrap();

    let mid = track.sample(500.0).unwrap();
    assert!(quat_approx(mid, Quat::from_rotation_y(FRAC_PI_2 / 2.0)));
}

#[test]
fn slerp_output_is_unit_length_for_either_sign() {
    let a = Quat::from_rotation_x(0.3);
    let b = Quat::from_rotation_x(1.2);
    for end in [b, -b] {
        for t in [0.0, 0.25, 0.5, 0.9, 1.0] {
            let q = slerp_shortest(a, end, t);
            assert!((q.length() - 1.0).abs() < EPSILON, "t={t}: |q|={}", q.length());
        }
    }
}

#[test]
fn slerp_negated_operand_takes_short_path() {
    let a = Quat::from_rotation_z(0.2);
    let b = Quat::from_rotation_z(0.6);
    let direct = slerp_shortest(a, b, 0.5);
    let flipped = slerp_shortest(a, -b, 0.5);
    assert!(quat_approx(direct, flipped));
    assert!(quat_approx(direct, Quat::from_rotation_z(0.4)));
}

// ============================================================================
// Animator: Lifecycle
// ============================================================================

#[test]
fn spawned_entity_starts_idle() {
    let mut animator = Animator::default();
    let entity = animator.spawn();
    assert_eq!(animator.mixer(entity).unwrap().state(), MixerState::Idle);
    assert_eq!(animator.blend_weight(entity).unwrap(), 0.0);
}

#[test]
fn despawned_entity_is_not_found() {
    let mut animator = Animator::default();
    let entity = animator.spawn();
    assert!(animator.despawn(entity));

    let err = animator.push_animation(entity, "walk").unwrap_err();
    assert!(matches!(err, Error::EntityNotFound));
    assert!(matches!(animator.advance(entity, 16.0), Err(Error::EntityNotFound)));
    assert_eq!(err.kind(), ErrorKind::CallerContract);
}

#[tokio::test]
async fn unknown_clip_surfaces_at_evaluation() {
    let model = load_rig().await;
    let mut animator = Animator::default();
    let entity = animator.spawn();

    animator.push_animation(entity, "moonwalk").unwrap();
    let err = animator.compute_joint_matrices(&model, entity).unwrap_err();
    assert!(matches!(err, Error::ClipNotFound(ref key) if key == "moonwalk"));
}

#[test]
fn state_machine_follows_pushes_and_time() {
    let mut animator = Animator::default();
    let entity = animator.spawn();

    animator.push_animation(entity, "idle").unwrap();
    assert_eq!(animator.mixer(entity).unwrap().state(), MixerState::SingleClip);

    animator.push_animation(entity, "walk").unwrap();
    assert_eq!(animator.mixer(entity).unwrap().state(), MixerState::Blending);

    animator.advance_all(300.0);
    assert_eq!(animator.mixer(entity).unwrap().state(), MixerState::SingleClip);
    assert_eq!(
        animator.mixer(entity).unwrap().current().unwrap().clip_key,
        "walk"
    );
}

// ============================================================================
// Animator: Blending
// ============================================================================

#[tokio::test]
async fn single_clip_samples_current_clip() {
    let model = load_rig().await;
    let mut animator = Animator::default();
    let entity = animator.spawn();

    animator.push_animation(entity, "walk").unwrap();
    animator.advance(entity, 500.0).unwrap();

    let locals = animator.local_transforms(&model, entity).unwrap();
    assert_eq!(locals.len(), 1);
    assert!(vec_approx(locals[&0].translation, Vec3::new(0.5, 0.0, 0.0)));
    assert_eq!(locals[&0].rotation, Quat::IDENTITY);
    assert_eq!(locals[&0].scale, Vec3::ONE);
}

#[tokio::test]
async fn crossfade_is_halfway_after_half_window() {
    let model = load_rig().await;
    let mut animator = Animator::new(AnimatorConfig {
        blend_window_ms: 300.0,
        ..Default::default()
    });
    let entity = animator.spawn();

    animator.push_animation(entity, "idle").unwrap();
    animator.push_animation(entity, "walk").unwrap();
    animator.advance(entity, 150.0).unwrap();

    assert!((animator.blend_weight(entity).unwrap() - 0.5).abs() < EPSILON);

    // walk at 150ms: (0.15,0,0); idle at 150ms: (0,2,0)
    let locals = animator.local_transforms(&model, entity).unwrap();
    assert!(vec_approx(locals[&0].translation, Vec3::new(0.075, 1.0, 0.0)));

    // spine is only animated by idle; walk contributes identity
    let idle_spine = Quat::IDENTITY.slerp(Quat::from_rotation_z(FRAC_PI_2), 0.075);
    let expected = Quat::IDENTITY.slerp(idle_spine, 0.5);
    assert!(quat_approx(locals[&1].rotation, expected));
}

#[tokio::test]
async fn crossfade_starts_at_previous_pose() {
    let model = load_rig().await;
    let mut animator = Animator::default();
    let entity = animator.spawn();

    animator.push_animation(entity, "idle").unwrap();
    animator.advance(entity, 1000.0).unwrap();
    let before = animator.local_transforms(&model, entity).unwrap();

    animator.push_animation(entity, "walk").unwrap();
    assert_eq!(animator.blend_weight(entity).unwrap(), 1.0);
    let after = animator.local_transforms(&model, entity).unwrap();

    for node in [0, 1] {
        assert!(vec_approx(after[&node].translation, before[&node].translation));
        assert!(quat_approx(after[&node].rotation, before[&node].rotation));
    }
}

#[tokio::test]
async fn crossfade_ends_at_new_clip_alone() {
    let model = load_rig().await;
    let mut animator = Animator::default();
    let entity = animator.spawn();

    animator.push_animation(entity, "idle").unwrap();
    animator.push_animation(entity, "walk").unwrap();
    animator.advance(entity, 450.0).unwrap();
    let blended = animator.local_transforms(&model, entity).unwrap();

    let mut solo = Animator::default();
    let reference = solo.spawn();
    solo.push_animation(reference, "walk").unwrap();
    solo.advance(reference, 450.0).unwrap();
    let alone = solo.local_transforms(&model, reference).unwrap();

    assert_eq!(blended, alone);
}

#[tokio::test]
async fn repeated_push_keeps_clock() {
    let model = load_rig().await;
    let mut animator = Animator::default();
    let entity = animator.spawn();

    animator.push_animation(entity, "walk").unwrap();
    animator.advance(entity, 250.0).unwrap();
    animator.push_animation(entity, "walk").unwrap();

    let locals = animator.local_transforms(&model, entity).unwrap();
    assert!(vec_approx(locals[&0].translation, Vec3::new(0.25, 0.0, 0.0)));
}

#[tokio::test]
async fn zero_window_switches_instantly() {
    let model = load_rig().await;
    let mut animator = Animator::new(AnimatorConfig {
        blend_window_ms: 0.0,
        ..Default::default()
    });
    let entity = animator.spawn();

    animator.push_animation(entity, "idle").unwrap();
    animator.push_animation(entity, "walk").unwrap();

    let locals = animator.local_transforms(&model, entity).unwrap();
    assert_eq!(locals.len(), 1);
    assert!(vec_approx(locals[&0].translation, Vec3::ZERO));
}
