//! What the scripted typist types.

use self::Keystroke::*;

/// One step of a scripted message.
#[derive(Debug, Clone, Copy)]
pub enum Keystroke {
    /// Type these characters one by one.
    Type(&'static str),
    /// Press backspace this many times.
    Backspace(usize),
    /// Think for this many milliseconds.
    Pause(u64),
}

/// Messages typed in order, each committed when done.
pub const SCRIPT: &[&[Keystroke]] = &[
    &[Type("hello bob"), Pause(400), Type("!")],
    &[
        Type("real-time text shows tpy"),
        Pause(300),
        Backspace(2),
        Type("ypos as they happen"),
    ],
    &[Type("déjà vu, ünïcode too"), Pause(700), Backspace(4), Type("fine")],
];
