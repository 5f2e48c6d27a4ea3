//! Keyboard-to-note layout: number row plays the bass octave, home row the
//! lead octave, with accidentals on the rows between.

pub struct KeyBinding {
    pub key: char,
    pub note: &'static str,
}

const fn bind(key: char, note: &'static str) -> KeyBinding {
    KeyBinding { key, note }
}

pub const KEY_BINDINGS: &[KeyBinding] = &[
    // Bass octave (C3 - B3)
    bind('1', "C3"),
    bind('z', "C#3"),
    bind('2', "D3"),
    bind('x', "D#3"),
    bind('3', "E3"),
    bind('4', "F3"),
    bind('c', "F#3"),
    bind('5', "G3"),
    bind('v', "G#3"),
    bind('6', "A3"),
    bind('b', "A#3"),
    bind('7', "B3"),
    // Lead octave (C4 - F5)
    bind('a', "C4"),
    bind('w', "C#4"),
    bind('s', "D4"),
    bind('e', "D#4"),
    bind('d', "E4"),
    bind('f', "F4"),
    bind('t', "F#4"),
    bind('g', "G4"),
    bind('y', "G#4"),
    bind('h', "A4"),
    bind('u', "A#4"),
    bind('j', "B4"),
    bind('k', "C5"),
    bind('o', "C#5"),
    bind('l', "D5"),
    bind('p', "D#5"),
    bind(';', "E5"),
    bind('\'', "F5"),
];

pub fn note_for(key: char) -> Option<&'static str> {
    let key = key.to_ascii_lowercase();
    KEY_BINDINGS
        .iter()
        .find(|binding| binding.key == key)
        .map(|binding| binding.note)
}
