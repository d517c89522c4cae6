//! Pilot stick mixing for autonomous modes
//!
//! Two mutually exclusive blending strategies, selected by configuration:
//!
//! - **Direct**: blends the stick linearly into the post-stabilization servo
//!   output. Full pilot authority near center stick, decaying to nothing at
//!   full deflection so large deliberate inputs are not fought.
//! - **FBW**: perturbs the pre-stabilization attitude demand. Inputs beyond
//!   half deflection are reshaped non-linearly up to 2x the attitude limit,
//!   so the pilot can always out-command a saturated demand.
//!
//! Modes with their own mixing semantics (acro, the FBW family, autotune,
//! cruise, training) are exempt from both strategies; stabilize is exempt
//! from direct mixing only.

use crate::channel::{Channels, ControlChannel};
use crate::context::TickContext;
use crate::mode::ControlMode;

/// Stick mixing strategy selector (parameter `STICK_MIXING`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StickMixing {
    Disabled,
    /// Blend into the attitude demand before stabilization
    #[default]
    Fbw,
    /// Blend into the servo output after stabilization
    Direct,
}

/// Whether the current settings and mode allow stick mixing at all
///
/// In auto-throttle modes, mixing additionally requires no active failsafe
/// and geofence permission. In pilot-throttle modes mixing is always on,
/// except during an FBWA-glide failsafe.
pub fn stick_mixing_enabled(ctx: &TickContext, selector: StickMixing) -> bool {
    if ctx.mode.auto_throttle() {
        return selector != StickMixing::Disabled
            && ctx.geofence_allows_mixing
            && !ctx.failsafe.active;
    }
    // non-auto mode: always mix, unless gliding on failsafe
    !ctx.failsafe.fbwa_glide
}

/// Blend one channel's stick into a servo demand
///
/// Influence decays linearly from 1 at center stick to 0 at 400 us of
/// deflection, then the stick-derived angle is added on top.
pub fn stick_mix_channel(channel: &ControlChannel, servo_out: i16) -> i16 {
    let deflection = (channel.radio_in as f32 - channel.radio_trim as f32).abs();
    let influence = (400.0 - deflection.min(400.0)) / 400.0;
    let mixed = servo_out as f32 * influence + channel.pwm_to_angle() as f32;
    mixed.clamp(-4500.0, 4500.0) as i16
}

fn direct_mixing_exempt(mode: ControlMode) -> bool {
    mode.is_vtol()
        || matches!(
            mode,
            ControlMode::Acro
                | ControlMode::FlyByWireA
                | ControlMode::Autotune
                | ControlMode::FlyByWireB
                | ControlMode::Cruise
                | ControlMode::Training
                | ControlMode::Stabilize
        )
}

fn fbw_mixing_exempt(mode: ControlMode, auto_fbw_steer: bool) -> bool {
    mode.is_vtol()
        || matches!(
            mode,
            ControlMode::Acro
                | ControlMode::FlyByWireA
                | ControlMode::Autotune
                | ControlMode::FlyByWireB
                | ControlMode::Cruise
                | ControlMode::Training
        )
        || (mode == ControlMode::Auto && auto_fbw_steer)
}

/// Direct stick mixing, applied to roll/pitch servo outputs after
/// stabilization
pub fn stabilize_stick_mixing_direct(
    ctx: &TickContext,
    selector: StickMixing,
    channels: &mut Channels,
) {
    if !stick_mixing_enabled(ctx, selector) || direct_mixing_exempt(ctx.mode) {
        return;
    }
    channels.roll.servo_out = stick_mix_channel(&channels.roll, channels.roll.servo_out);
    channels.pitch.servo_out = stick_mix_channel(&channels.pitch, channels.pitch.servo_out);
}

/// Reshape a normalized input so full stick reaches 2x the limit
///
/// Linear up to half deflection, then `3x - 1` (sign-symmetric).
fn fbw_shape(input: f32) -> f32 {
    if input > 0.5 {
        3.0 * input - 1.0
    } else if input < -0.5 {
        3.0 * input + 1.0
    } else {
        input
    }
}

/// FBW-style stick mixing, applied to the attitude demands before
/// stabilization
///
/// `roll_limit_cd` is the working (possibly load-factor narrowed) limit.
/// Pitch inverts sign when flying inverted and uses the separate up/down
/// limits.
#[allow(clippy::too_many_arguments)]
pub fn stabilize_stick_mixing_fbw(
    ctx: &TickContext,
    selector: StickMixing,
    auto_fbw_steer: bool,
    channels: &Channels,
    nav_roll_cd: &mut i32,
    nav_pitch_cd: &mut i32,
    roll_limit_cd: i32,
    pitch_limit_max_cd: i32,
    pitch_limit_min_cd: i32,
) {
    if !stick_mixing_enabled(ctx, selector) || fbw_mixing_exempt(ctx.mode, auto_fbw_steer) {
        return;
    }

    let roll_input = fbw_shape(channels.roll.norm_input_dz());
    *nav_roll_cd += (roll_input * roll_limit_cd as f32) as i32;
    *nav_roll_cd = (*nav_roll_cd).clamp(-roll_limit_cd, roll_limit_cd);

    let mut pitch_input = channels.pitch.norm_input_dz();
    if pitch_input.abs() > 0.5 {
        pitch_input = 3.0 * pitch_input - 1.0 * pitch_input.signum();
    }
    if ctx.fly_inverted {
        pitch_input = -pitch_input;
    }
    if pitch_input > 0.0 {
        *nav_pitch_cd += (pitch_input * pitch_limit_max_cd as f32) as i32;
    } else {
        *nav_pitch_cd += -(pitch_input * pitch_limit_min_cd as f32) as i32;
    }
    *nav_pitch_cd = (*nav_pitch_cd).clamp(pitch_limit_min_cd, pitch_limit_max_cd);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mode::ControlMode;

    fn auto_ctx() -> TickContext {
        TickContext {
            mode: ControlMode::Auto,
            ..TickContext::default()
        }
    }

    // ========== Enable Predicate Tests ==========

    #[test]
    fn test_enabled_in_auto_without_failsafe() {
        let ctx = auto_ctx();
        assert!(stick_mixing_enabled(&ctx, StickMixing::Fbw));
        assert!(!stick_mixing_enabled(&ctx, StickMixing::Disabled));
    }

    #[test]
    fn test_disabled_in_auto_on_failsafe() {
        let mut ctx = auto_ctx();
        ctx.failsafe.active = true;
        assert!(!stick_mixing_enabled(&ctx, StickMixing::Fbw));
    }

    #[test]
    fn test_disabled_in_auto_when_geofence_forbids() {
        let mut ctx = auto_ctx();
        ctx.geofence_allows_mixing = false;
        assert!(!stick_mixing_enabled(&ctx, StickMixing::Fbw));
    }

    #[test]
    fn test_always_enabled_in_pilot_modes() {
        let mut ctx = TickContext {
            mode: ControlMode::FlyByWireA,
            ..TickContext::default()
        };
        assert!(stick_mixing_enabled(&ctx, StickMixing::Disabled));
        ctx.failsafe.fbwa_glide = true;
        assert!(!stick_mixing_enabled(&ctx, StickMixing::Disabled));
    }

    // ========== Direct Mixing Tests ==========

    #[test]
    fn test_direct_full_authority_at_center() {
        let mut ch = ControlChannel::angle();
        ch.radio_in = ch.radio_trim;
        // center stick: output passes through untouched
        assert_eq!(stick_mix_channel(&ch, 1200), 1200);
    }

    #[test]
    fn test_direct_stick_overrides_at_full_deflection() {
        let mut ch = ControlChannel::angle();
        ch.radio_in = 2000; // 500us past trim, influence 0
        let mixed = stick_mix_channel(&ch, -3000);
        assert_eq!(mixed, 4500, "full stick must fully replace the output");
    }

    #[test]
    fn test_direct_partial_deflection_blends() {
        let mut ch = ControlChannel::angle();
        ch.radio_in = 1700; // 200us: influence 0.5
        let mixed = stick_mix_channel(&ch, 2000);
        let stick = ch.pwm_to_angle() as i32;
        assert_eq!(mixed as i32, 1000 + stick);
    }

    #[test]
    fn test_direct_skipped_in_stabilize() {
        let ctx = TickContext {
            mode: ControlMode::Stabilize,
            ..TickContext::default()
        };
        let mut channels = Channels::new();
        channels.roll.servo_out = 1234;
        channels.roll.radio_in = 2000;
        stabilize_stick_mixing_direct(&ctx, StickMixing::Direct, &mut channels);
        assert_eq!(channels.roll.servo_out, 1234, "stabilize is exempt");
    }

    #[test]
    fn test_direct_applies_in_auto() {
        let ctx = auto_ctx();
        let mut channels = Channels::new();
        channels.roll.servo_out = 1000;
        channels.roll.radio_in = 2000;
        stabilize_stick_mixing_direct(&ctx, StickMixing::Direct, &mut channels);
        assert_ne!(channels.roll.servo_out, 1000);
    }

    // ========== FBW Mixing Tests ==========

    #[test]
    fn test_fbw_shape_linear_then_steep() {
        assert!((fbw_shape(0.25) - 0.25).abs() < 0.001);
        assert!((fbw_shape(1.0) - 2.0).abs() < 0.001);
        assert!((fbw_shape(-1.0) + 2.0).abs() < 0.001);
        assert!((fbw_shape(0.5) - 0.5).abs() < 0.001, "continuous at the knee");
    }

    #[test]
    fn test_fbw_perturbs_and_clamps_roll() {
        let ctx = auto_ctx();
        let mut channels = Channels::new();
        channels.roll.radio_in = 2000; // full right
        let mut nav_roll = 3000;
        let mut nav_pitch = 0;
        stabilize_stick_mixing_fbw(
            &ctx,
            StickMixing::Fbw,
            false,
            &channels,
            &mut nav_roll,
            &mut nav_pitch,
            4500,
            2000,
            -2500,
        );
        assert_eq!(nav_roll, 4500, "2x authority clamps at the working limit");
    }

    #[test]
    fn test_fbw_center_stick_leaves_demand() {
        let ctx = auto_ctx();
        let channels = Channels::new();
        let mut nav_roll = 3000;
        let mut nav_pitch = 500;
        stabilize_stick_mixing_fbw(
            &ctx,
            StickMixing::Fbw,
            false,
            &channels,
            &mut nav_roll,
            &mut nav_pitch,
            4500,
            2000,
            -2500,
        );
        assert_eq!(nav_roll, 3000);
        assert_eq!(nav_pitch, 500);
    }

    #[test]
    fn test_fbw_inverted_flips_pitch() {
        let mut ctx = auto_ctx();
        ctx.fly_inverted = true;
        let mut channels = Channels::new();
        channels.pitch.radio_in = 1700; // pull up
        let mut nav_roll = 0;
        let mut nav_pitch = 0;
        stabilize_stick_mixing_fbw(
            &ctx,
            StickMixing::Fbw,
            false,
            &channels,
            &mut nav_roll,
            &mut nav_pitch,
            4500,
            2000,
            -2500,
        );
        assert!(nav_pitch < 0, "inverted flight flips the pitch sense, got {}", nav_pitch);
    }

    #[test]
    fn test_fbw_exempt_in_auto_with_fbw_steer() {
        let ctx = auto_ctx();
        let mut channels = Channels::new();
        channels.roll.radio_in = 2000;
        let mut nav_roll = 1000;
        let mut nav_pitch = 0;
        stabilize_stick_mixing_fbw(
            &ctx,
            StickMixing::Fbw,
            true,
            &channels,
            &mut nav_roll,
            &mut nav_pitch,
            4500,
            2000,
            -2500,
        );
        assert_eq!(nav_roll, 1000, "AUTO with FBW steer has its own semantics");
    }
}
