use termcolor::{Color, ColorSpec};

/// The color specs used by the printers for the parts of their output.
///
/// The default is no styling at all. [`ColorSpecs::default_with_color`]
/// returns a conservative choice that works across terminal themes.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ColorSpecs {
    origin: ColorSpec,
    offset: ColorSpec,
}

impl ColorSpecs {
    /// Create color specs that leave all output unstyled.
    pub fn new() -> ColorSpecs {
        ColorSpecs::default()
    }

    /// Create color specs with a default set of colors: magenta origins
    /// and green offsets.
    pub fn default_with_color() -> ColorSpecs {
        let mut origin = ColorSpec::new();
        origin.set_fg(Some(Color::Magenta));
        let mut offset = ColorSpec::new();
        offset.set_fg(Some(Color::Green));
        ColorSpecs { origin, offset }
    }

    /// The spec used to print an origin name.
    pub fn origin(&self) -> &ColorSpec {
        &self.origin
    }

    /// The spec used to print a match offset.
    pub fn offset(&self) -> &ColorSpec {
        &self.offset
    }
}
