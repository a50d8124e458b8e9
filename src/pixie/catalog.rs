//! Effects, pictures and transitions built into the Pixie firmware.

pub const EFFECTS: &[&str] = &[
    "ColorLoop",
    "Rainbow",
    "DoubleRainbow",
    "RainbowChase",
    "RunningLights",
    "TwoColors",
    "ThreeColors",
    "ColorPeaks",
    "Sparks",
    "Comet",
    "CometWithParticles",
    "RandomComets",
    "ColorFadings",
    "Sparkles",
    "SparklesOnColor",
    "SparklesOnColorLoop",
    "RainbowWipesUp",
    "RainbowWipesDown",
    "ColorWipes",
    "Chain",
    "BrokenLamp",
    "FastPixels",
    "BrightStripes",
    "DarkStripes",
    "MulticolorBurst",
    "OneColorBurst",
    "RandomColorBurst",
    "ColorPendulum",
    "RainbowScan",
    "DoubleRainbowScan",
    "RandomColor",
    "ChaseDown",
    "ChaseUp",
    "Chase2Down",
    "Chase2Up",
    "SporadicMeteors",
    "Dots",
    "RGBScanner",
    "Twinkles",
    "PixelQueue",
    "PeriodicMeteorsUp",
    "PeriodicMeteorsDown",
    "Flicker",
    "MultiplePixelQueues",
    "MultipleColorPixelQueues",
    "Fireworks",
    "Strobe",
    "BigSparks",
    "RunAndLightUp",
    "Moths",
    "Breathe",
    "Pixie",
    "Neutrinos",
    "Emitter",
    "BlackHole",
    "ColorRunsUp",
    "ColorRunsDown",
    "LightBars",
    "Fireworks2",
    "Paintbrush",
    "Lightning",
    "DarkSparklesOnColor",
    "Noise",
    "Particles",
    "Curtains",
    "Scanner",
];

pub const PICTURES: &[&str] = &[
    "Rainbow",
    "Rainbow2",
    "Rainbow3",
    "Rainbow4",
    "Dots",
    "Stripes",
    "ProgressBar",
    "Noise",
];

pub const TRANSITIONS: &[&str] = &[
    "Fade",
    "Unfold",
    "Fold",
    "Unroll",
    "Roll",
    "Dots",
    "FadeOut",
    "SinIn",
    "SinOut",
    "Paintbrush",
    "Curtains",
];

pub fn is_effect(name: &str) -> bool {
    EFFECTS.contains(&name)
}

pub fn is_picture(name: &str) -> bool {
    PICTURES.contains(&name)
}

pub fn is_transition(name: &str) -> bool {
    TRANSITIONS.contains(&name)
}

/// Service callers sometimes pass names wrapped in quotes.
pub fn strip_quotes(name: &str) -> &str {
    name.trim_matches('"').trim_matches('\'')
}
