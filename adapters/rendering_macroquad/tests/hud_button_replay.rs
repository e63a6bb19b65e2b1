use neuroflight_rendering_macroquad::HudInputState;

fn run_sequence(clicks: &[bool]) -> Vec<bool> {
    let mut state = HudInputState::default();
    let mut toggles = Vec::new();
    for &clicked in clicks {
        toggles.push(state.take_mode_toggle());
        if clicked {
            state.register_mode_toggle();
        }
    }
    toggles.push(state.take_mode_toggle());
    toggles
}

#[test]
fn hud_clicks_reach_the_next_frame_exactly_once() {
    let clicks = [false, true, false, true, true, false];
    let expected = vec![false, false, true, false, true, true, false];

    assert_eq!(run_sequence(&clicks), expected);
    assert_eq!(run_sequence(&clicks), run_sequence(&clicks));
}

#[test]
fn repeated_clicks_within_a_frame_collapse() {
    let mut state = HudInputState::default();
    state.register_mode_toggle();
    state.register_mode_toggle();
    assert!(state.take_mode_toggle());
    assert!(!state.take_mode_toggle());
}
