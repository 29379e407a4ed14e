//! Line-oriented G-code parser and motion state machine.
//!
//! Each source line is split at the first comment delimiter, tokenized into
//! a code and letter/value parameters, and dispatched through a closed
//! handler table. Motion commands are resolved against the threaded
//! [`MotionState`] to absolute coordinates; everything recoverable that goes
//! wrong lands in the diagnostic stream and parsing continues. The single
//! fatal code is `G20` (inches).

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use tracing::{debug, error, warn};

use crate::command::Command;
use crate::coords::{Axis, AxisMask, Coords};
use crate::diagnostics::{Diagnostic, Severity};
use crate::error::{ParseError, Result};
use crate::model::{Document, Line, MotionCode, Segment};

/// Trailing-comment delimiter.
const COMMENT_CHAR: char = ';';

/// Closed handler table for code tokens; no runtime introspection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Handler {
    /// `G0`/`G1` motion.
    Move(MotionCode),
    /// `G20`: fatal, inch-space input is unsupported.
    UnitsInches,
    /// `G21`: millimeters, the only space there is; inert.
    UnitsMm,
    /// `G28` homing.
    Home,
    /// `G29` bed levelling; inert.
    BedLevel,
    /// `G90` absolute positioning.
    AbsolutePositioning,
    /// `G91` relative positioning.
    RelativePositioning,
    /// `G92` set position.
    SetPosition,
    /// `M82` absolute extrusion.
    AbsoluteExtrusion,
    /// `M83` relative extrusion.
    RelativeExtrusion,
    /// Recognized M-codes this layer leaves uninterpreted.
    Inert,
    /// `M117`: display message, argument is free text.
    Message,
    /// Forward-compatibility fallback.
    Unknown,
}

fn lookup(code: &str) -> Handler {
    match code {
        "G0" => Handler::Move(MotionCode::Rapid),
        "G1" => Handler::Move(MotionCode::Controlled),
        "G20" => Handler::UnitsInches,
        "G21" => Handler::UnitsMm,
        "G28" => Handler::Home,
        "G29" => Handler::BedLevel,
        "G90" => Handler::AbsolutePositioning,
        "G91" => Handler::RelativePositioning,
        "G92" => Handler::SetPosition,
        "M82" => Handler::AbsoluteExtrusion,
        "M83" => Handler::RelativeExtrusion,
        "M104" | "M106" | "M109" | "M140" | "M190" => Handler::Inert,
        "M117" => Handler::Message,
        _ => Handler::Unknown,
    }
}

/// Accumulated origin shift applied by homing and set-position commands.
/// Feed rate has no offset.
#[derive(Debug, Clone, Copy, Default)]
struct Offset {
    x: f64,
    y: f64,
    z: f64,
    e: f64,
}

/// Process-local state threaded through parsing. Mutated only by motion,
/// position-setting and mode commands; never read outside this machine.
#[derive(Debug, Clone, Default)]
struct MotionState {
    offset: Offset,
    /// Last coordinate state relative to the offset.
    relative: Coords,
    /// `G91`: X/Y/Z words are deltas.
    is_relative: bool,
    /// `M83`: E words are deltas, independent of `is_relative`.
    relative_extrusion: bool,
}

/// A parsed document together with the ordered diagnostics the parser
/// collected along the way.
#[derive(Debug)]
pub struct ParseOutput {
    /// The post-processed document.
    pub document: Document,
    /// Warnings, in source order.
    pub diagnostics: Vec<Diagnostic>,
}

/// Parses G-code text into a [`Document`].
///
/// The parser is single-use: feed it one source via [`GcodeParser::parse_str`],
/// [`GcodeParser::parse_reader`] or [`GcodeParser::parse_file`]. The
/// post-process pipeline (classification, layer splitting, metrics) runs
/// exactly once, after the last line.
#[derive(Debug, Default)]
pub struct GcodeParser {
    state: MotionState,
    document: Document,
    diagnostics: Vec<Diagnostic>,
    line_no: usize,
}

impl GcodeParser {
    /// Create a parser with a zeroed motion state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse an in-memory source.
    pub fn parse_str(mut self, source: &str) -> Result<ParseOutput> {
        for line in source.lines() {
            self.parse_line(line)?;
        }
        self.finish()
    }

    /// Parse from a buffered reader.
    pub fn parse_reader<R: BufRead>(mut self, reader: R) -> Result<ParseOutput> {
        for line in reader.lines() {
            self.parse_line(&line?)?;
        }
        self.finish()
    }

    /// Open and parse a G-code file.
    pub fn parse_file(self, path: impl AsRef<Path>) -> Result<ParseOutput> {
        let file = File::open(path)?;
        self.parse_reader(BufReader::new(file))
    }

    fn finish(mut self) -> Result<ParseOutput> {
        self.document.relative_extrusion = self.state.relative_extrusion;
        self.document.post_process();
        debug!(
            lines = self.document.lines.len(),
            layers = self.document.layers.len(),
            "parsed document"
        );
        Ok(ParseOutput {
            document: self.document,
            diagnostics: self.diagnostics,
        })
    }

    fn parse_line(&mut self, raw: &str) -> Result<()> {
        self.line_no += 1;
        let text = raw.trim_end().to_string();

        let content = match text.split_once(COMMENT_CHAR) {
            Some((before, _)) => before,
            None => text.as_str(),
        };
        let trimmed = content.trim();
        // Comment-only and blank lines are recorded, not dispatched, so that
        // serialization reproduces the source exactly.
        if trimmed.is_empty() {
            self.document.lines.push(Line::Comment {
                line_no: self.line_no,
                text,
            });
            return Ok(());
        }

        let (code, args) = match trimmed.split_once(char::is_whitespace) {
            Some((code, args)) => (code, args),
            None => (trimmed, ""),
        };

        match lookup(code) {
            Handler::Move(motion) => {
                let cmd = self.tokenize(code, args, &text);
                self.do_move(&cmd, motion, &text);
            }
            Handler::UnitsInches => {
                error!(line = self.line_no, "unsupported unit system G20 (inches)");
                return Err(ParseError::UnsupportedUnits {
                    line_no: self.line_no,
                    text,
                });
            }
            Handler::UnitsMm | Handler::BedLevel => {
                self.push_non_motion(code, &text);
            }
            Handler::Home => {
                let cmd = self.tokenize(code, args, &text);
                self.do_home(&cmd, &text);
            }
            Handler::SetPosition => {
                let cmd = self.tokenize(code, args, &text);
                self.do_set_position(&cmd, &text);
            }
            Handler::AbsolutePositioning => {
                self.state.is_relative = false;
                self.push_non_motion(code, &text);
            }
            Handler::RelativePositioning => {
                self.state.is_relative = true;
                self.push_non_motion(code, &text);
            }
            Handler::AbsoluteExtrusion => {
                self.state.relative_extrusion = false;
                self.push_non_motion(code, &text);
            }
            Handler::RelativeExtrusion => {
                self.state.relative_extrusion = true;
                self.push_non_motion(code, &text);
            }
            Handler::Inert => {
                self.tokenize(code, args, &text);
                self.warn(format!("{} recognized but not interpreted", code), &text);
                self.push_non_motion(code, &text);
            }
            Handler::Message => {
                self.warn("M117 recognized but not interpreted".to_string(), &text);
                self.push_non_motion(code, &text);
            }
            Handler::Unknown => {
                self.tokenize(code, args, &text);
                self.warn(format!("unknown code '{}'", code), &text);
                self.push_non_motion(code, &text);
            }
        }
        Ok(())
    }

    /// `G0`/`G1`: resolve the named axes against the motion state and emit a
    /// segment at the absolute position.
    fn do_move(&mut self, cmd: &Command, code: MotionCode, text: &str) {
        let mut coords = self.state.relative;
        let mut fields = AxisMask::default();
        for (letter, value) in cmd.params() {
            match Axis::from_letter(letter) {
                // Feed rate has no relative mode.
                Some(Axis::F) => {
                    coords.f = value;
                    fields.f = true;
                }
                // E follows relative_extrusion, independent of is_relative.
                Some(Axis::E) => {
                    if self.state.relative_extrusion {
                        coords.e += value;
                    } else {
                        coords.e = value;
                    }
                    fields.e = true;
                }
                Some(Axis::X) => {
                    if self.state.is_relative {
                        coords.x += value;
                    } else {
                        coords.x = value;
                    }
                    fields.x = true;
                }
                Some(Axis::Y) => {
                    if self.state.is_relative {
                        coords.y += value;
                    } else {
                        coords.y = value;
                    }
                    fields.y = true;
                }
                Some(Axis::Z) => {
                    if self.state.is_relative {
                        coords.z += value;
                    } else {
                        coords.z = value;
                    }
                    fields.z = true;
                }
                None => self.warn(format!("unknown axis '{}'", letter), text),
            }
        }

        let offset = self.state.offset;
        let absolute = Coords {
            x: offset.x + coords.x,
            y: offset.y + coords.y,
            z: offset.z + coords.z,
            f: coords.f,
            e: offset.e + coords.e,
        };
        self.document.lines.push(Line::Motion(Segment::new(
            code,
            absolute,
            fields,
            self.line_no,
            text.to_string(),
        )));
        self.state.relative = coords;
    }

    /// `G28`: axes listed (all of X/Y/Z when none are) have both offset and
    /// relative position set to the commanded value, redefining absolute
    /// zero for them; a segment is emitted at the resulting position.
    fn do_home(&mut self, cmd: &Command, text: &str) {
        let pairs: Vec<(char, f64)> = if cmd.is_empty() {
            vec![('X', 0.0), ('Y', 0.0), ('Z', 0.0)]
        } else {
            cmd.params().collect()
        };
        let fields = self.rewrite_axes(&pairs, text);
        self.document.lines.push(Line::Motion(Segment::new(
            MotionCode::Home,
            self.state.relative,
            fields,
            self.line_no,
            text.to_string(),
        )));
    }

    /// `G92`: the same offset/position rewrite over X/Y/Z/E (all four zeroed
    /// when none are listed). No physical motion happens, but the emitted
    /// segment carries the updated state so later accounting starts from the
    /// right point; its code tags it as a zero-distance anchor.
    fn do_set_position(&mut self, cmd: &Command, text: &str) {
        let pairs: Vec<(char, f64)> = if cmd.is_empty() {
            vec![('X', 0.0), ('Y', 0.0), ('Z', 0.0), ('E', 0.0)]
        } else {
            cmd.params().collect()
        };
        let fields = self.rewrite_axes(&pairs, text);
        self.document.lines.push(Line::Motion(Segment::new(
            MotionCode::SetPosition,
            self.state.relative,
            fields,
            self.line_no,
            text.to_string(),
        )));
    }

    /// Transfer commanded values into both offset and relative position for
    /// the offset-bearing axes (X/Y/Z/E).
    fn rewrite_axes(&mut self, pairs: &[(char, f64)], text: &str) -> AxisMask {
        let mut fields = AxisMask::default();
        for &(letter, value) in pairs {
            match letter {
                'X' => {
                    self.state.offset.x = value;
                    self.state.relative.x = value;
                    fields.x = true;
                }
                'Y' => {
                    self.state.offset.y = value;
                    self.state.relative.y = value;
                    fields.y = true;
                }
                'Z' => {
                    self.state.offset.z = value;
                    self.state.relative.z = value;
                    fields.z = true;
                }
                'E' => {
                    self.state.offset.e = value;
                    self.state.relative.e = value;
                    fields.e = true;
                }
                _ => self.warn(format!("unknown axis '{}'", letter), text),
            }
        }
        fields
    }

    fn push_non_motion(&mut self, code: &str, text: &str) {
        self.document.lines.push(Line::NonMotion {
            code: code.to_string(),
            line_no: self.line_no,
            text: text.to_string(),
        });
    }

    fn tokenize(&mut self, code: &str, args: &str, text: &str) -> Command {
        let (cmd, invalid) = Command::tokenize(code, args);
        for bit in invalid {
            self.warn(format!("invalid numeric argument '{}'", bit), text);
        }
        cmd
    }

    fn warn(&mut self, message: String, text: &str) {
        warn!(line = self.line_no, "{}", message);
        self.diagnostics.push(Diagnostic {
            line_no: self.line_no,
            severity: Severity::Warning,
            message,
            text: text.to_string(),
        });
    }
}
