use std::{sync::Arc, thread, time::Instant};

use botscope_core::{MoveDirection, Primitive, RobotId, RobotStatus};
use botscope_system_diagnostics::{
    parse_line, stats_table, Diagnostics, DiagnosticsError, LiveFrames, Outcome, ParsedLine,
    StatusBoard,
};

fn run_session(lines: &[&str]) -> Vec<Result<Outcome, String>> {
    let diagnostics = Diagnostics::default();
    let mut outcomes = Vec::new();
    for line in lines {
        match parse_line(line) {
            ParsedLine::Empty => {}
            ParsedLine::Command(command) => outcomes.push(
                diagnostics
                    .handle(&command)
                    .map_err(|error: DiagnosticsError| error.to_string()),
            ),
            ParsedLine::Help(text) | ParsedLine::Invalid(text) => outcomes.push(Err(text)),
        }
    }
    outcomes
}

fn primitive(outcome: &Result<Outcome, String>) -> Option<Primitive> {
    match outcome {
        Ok(Outcome::Send { primitive, .. }) => Some(*primitive),
        _ => None,
    }
}

#[test]
fn scripted_session_produces_clamped_primitives() {
    let outcomes = run_session(&[
        "rotate 2",
        "",
        "move forward 250",
        "kick",
        "chip 5",
        "dribble 1.5",
        "stop",
        "quit",
    ]);

    let primitives: Vec<Option<Primitive>> = outcomes.iter().map(primitive).collect();
    assert_eq!(
        primitives,
        vec![
            Some(Primitive::Rotate {
                velocity_rad_per_s: 2.0
            }),
            Some(Primitive::Move {
                direction: MoveDirection::Forward,
                heading_degrees: 90,
                speed: 100.0,
            }),
            Some(Primitive::Kick { speed_m_per_s: 2.0 }),
            Some(Primitive::Chip { distance_m: 2.0 }),
            Some(Primitive::Dribble {
                velocity_rad_per_s: 1.5
            }),
            Some(Primitive::Stop),
            None,
        ]
    );
    assert_eq!(outcomes.last(), Some(&Ok(Outcome::Quit)));
}

#[test]
fn invalid_lines_report_errors_without_stopping_the_session() {
    let outcomes = run_session(&["move sideways 10", "warp 9", "kick 1"]);

    assert_eq!(outcomes.len(), 3);
    let direction_error = outcomes[0].as_ref().expect_err("direction rejected");
    assert!(direction_error.contains("sideways"));
    assert!(outcomes[1].is_err());
    assert_eq!(
        primitive(&outcomes[2]),
        Some(Primitive::Kick { speed_m_per_s: 1.0 })
    );
}

#[test]
fn live_stats_follow_statuses_published_by_another_thread() {
    let board = Arc::new(StatusBoard::new());
    let receiver_board = Arc::clone(&board);

    let receiver = thread::spawn(move || {
        for sequence_number in 0..20 {
            receiver_board.record(
                RobotStatus {
                    robot_id: RobotId::new(6),
                    sequence_number,
                    epoch_timestamp_seconds: 100 + sequence_number,
                    battery_voltage: 24.8,
                    capacitor_voltage: 210.0,
                    primitive_packet_loss_percentage: 1,
                    running_primitive: true,
                },
                Instant::now(),
            );
        }
    });
    receiver.join().expect("receiver thread finishes");

    let render_board = Arc::clone(&board);
    let frames: Vec<String> = LiveFrames::new(
        move || {
            let latest = render_board.latest();
            stats_table(latest.as_deref(), Instant::now()).to_string()
        },
        std::time::Duration::ZERO,
    )
    .with_frame_limit(Some(2))
    .collect();

    assert_eq!(frames.len(), 2);
    assert!(frames[0].contains("119"), "latest lifetime is displayed");
    assert!(frames[0].contains("ONLINE"));
}
