//! The proof log is an append-only stream of lines, each of which derives one constraint and is
//! identified by a [`ProofId`]. The format follows the cutting planes conventions used by
//! pseudo-Boolean proof checkers:
//!
//! - `f <constraint>`: a constraint of the input formula;
//! - `p <postfix derivation>`: a constraint derived by additions (`+`), multiplications (`*`),
//!   divisions (`d`), saturations (`s`) and weakenings (`w`) of earlier constraints;
//! - `u <constraint>`: a constraint implied by reverse unit propagation;
//! - `red <constraint> ; <witness>`: a constraint which is redundant given the witness;
//! - `o <literals>`: a solution, which derives the matching objective-improving constraint;
//! - `del id <ids>`: deletes constraints (does not consume an ID);
//! - `c <id>`: concludes that constraint `id` is a contradiction.
//!
//! IDs are handed out even when the log is disabled, so that the solver can use them to
//! identify constraints regardless of proof logging.
use std::fmt::Display;
use std::fmt::Formatter;
use std::fs::File;
use std::io::BufWriter;
use std::io::Write;
use std::path::Path;

use log::error;

use crate::basic_types::Lit;

/// The identifier of a line in the proof log.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProofId(u64);

impl ProofId {
    /// No identifier has been assigned.
    pub const UNDEF: ProofId = ProofId(0);
    /// Signals that adding a constraint made the database infeasible.
    pub const UNSAT: ProofId = ProofId(u64::MAX);
    /// Signals that an added constraint was trivially satisfied and not stored.
    pub const TRIVIAL: ProofId = ProofId(u64::MAX - 1);

    pub fn is_sentinel(self) -> bool {
        matches!(self, ProofId::UNDEF | ProofId::UNSAT | ProofId::TRIVIAL)
    }
}

impl Display for ProofId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match *self {
            ProofId::UNDEF => write!(f, "undef"),
            ProofId::UNSAT => write!(f, "unsat"),
            ProofId::TRIVIAL => write!(f, "trivial"),
            ProofId(id) => write!(f, "{id}"),
        }
    }
}

/// The sink to which proof lines are written. The default proof log is disabled.
pub struct ProofLog {
    writer: Option<Box<dyn Write>>,
    last_id: u64,
}

impl Default for ProofLog {
    fn default() -> Self {
        ProofLog {
            writer: None,
            last_id: 0,
        }
    }
}

impl std::fmt::Debug for ProofLog {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProofLog")
            .field("writer", &self.writer.as_ref().map(|_| "<Writer>"))
            .field("last_id", &self.last_id)
            .finish()
    }
}

impl ProofLog {
    /// Writes the proof to a file. If the path ends in `.gz` the proof is gzip-compressed.
    pub fn to_file(path: &Path) -> std::io::Result<ProofLog> {
        let file = File::create(path)?;

        #[cfg(feature = "gzipped-proofs")]
        let writer: Box<dyn Write> = if path.extension().is_some_and(|ext| ext == "gz") {
            Box::new(BufWriter::new(flate2::write::GzEncoder::new(
                file,
                flate2::Compression::fast(),
            )))
        } else {
            Box::new(BufWriter::new(file))
        };
        #[cfg(not(feature = "gzipped-proofs"))]
        let writer: Box<dyn Write> = Box::new(BufWriter::new(file));

        Ok(ProofLog::to_writer(writer))
    }

    /// Writes the proof to an arbitrary writer.
    pub fn to_writer(writer: impl Write + 'static) -> ProofLog {
        let mut proof_log = ProofLog {
            writer: Some(Box::new(writer)),
            last_id: 0,
        };
        proof_log.write_line(format_args!("pseudo-Boolean proof version 1.0"));
        proof_log
    }

    pub fn is_enabled(&self) -> bool {
        self.writer.is_some()
    }

    /// The ID of the most recently written line.
    pub fn last_id(&self) -> ProofId {
        ProofId(self.last_id)
    }

    pub(crate) fn log_comment(&mut self, comment: impl Display) {
        self.write_line(format_args!("* {comment}"));
    }

    pub(crate) fn log_formula(&mut self, constraint: impl Display) -> ProofId {
        self.write_line(format_args!("f {constraint}"));
        self.next_id()
    }

    pub(crate) fn log_derivation(&mut self, derivation: &str) -> ProofId {
        self.write_line(format_args!("p {derivation}"));
        self.next_id()
    }

    pub(crate) fn log_rup(&mut self, constraint: impl Display) -> ProofId {
        self.write_line(format_args!("u {constraint}"));
        self.next_id()
    }

    pub(crate) fn log_redundant(&mut self, constraint: impl Display, witness: &[Lit]) -> ProofId {
        let witness = witness
            .iter()
            .map(|lit| format!("{} -> {}", lit.var(), u8::from(lit.is_positive())))
            .collect::<Vec<_>>()
            .join(" ");
        self.write_line(format_args!("red {constraint} ; {witness}"));
        self.next_id()
    }

    pub(crate) fn log_solution(&mut self, true_literals: impl Iterator<Item = Lit>) -> ProofId {
        if self.is_enabled() {
            let literals = true_literals
                .map(|lit| lit.to_string())
                .collect::<Vec<_>>()
                .join(" ");
            self.write_line(format_args!("o {literals}"));
        }
        self.next_id()
    }

    pub(crate) fn log_deletion(&mut self, id: ProofId) {
        if !id.is_sentinel() {
            self.write_line(format_args!("del id {id}"));
        }
    }

    pub(crate) fn log_contradiction(&mut self, id: ProofId) {
        self.write_line(format_args!("c {id}"));
        self.flush();
    }

    pub(crate) fn flush(&mut self) {
        if let Some(writer) = self.writer.as_mut() {
            if let Err(e) = writer.flush() {
                error!("Failed to flush the proof log, disabling it: {e}");
                self.writer = None;
            }
        }
    }

    fn next_id(&mut self) -> ProofId {
        self.last_id += 1;
        ProofId(self.last_id)
    }

    fn write_line(&mut self, line: std::fmt::Arguments<'_>) {
        if let Some(writer) = self.writer.as_mut() {
            if let Err(e) = writeln!(writer, "{line}") {
                error!("Failed to write to the proof log, disabling it: {e}");
                self.writer = None;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;

    /// A writer which appends to a shared buffer, so tests can inspect the proof.
    #[derive(Clone, Default)]
    struct SharedBuffer(Rc<RefCell<Vec<u8>>>);

    impl Write for SharedBuffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.borrow_mut().write(buf)
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn ids_are_handed_out_without_a_writer() {
        let mut proof = ProofLog::default();
        assert!(!proof.is_enabled());
        assert_eq!(proof.log_formula("1 x1 >= 1 ;"), ProofId(1));
        assert_eq!(proof.log_derivation("1 2 +"), ProofId(2));
        proof.log_deletion(ProofId(1));
        assert_eq!(proof.log_rup("1 x2 >= 1 ;"), ProofId(3));
    }

    #[test]
    fn lines_are_written_in_order() {
        let buffer = SharedBuffer::default();
        let mut proof = ProofLog::to_writer(buffer.clone());

        let first = proof.log_formula("1 x1 1 x2 >= 1 ;");
        let second = proof.log_derivation(&format!("{first} 2 *"));
        proof.log_contradiction(second);

        let written = String::from_utf8(buffer.0.borrow().clone()).unwrap();
        assert_eq!(
            written,
            "pseudo-Boolean proof version 1.0\nf 1 x1 1 x2 >= 1 ;\np 1 2 *\nc 2\n"
        );
    }
}
