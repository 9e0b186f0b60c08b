use mailbox_wire::Instruction;

/// The host's command interpreter, as seen by the poll loop.
///
/// `Ok(None)` means the instruction ran and produced no value. `Err` carries
/// the interpreter's diagnostic; the loop turns it into an error response.
pub trait Interpreter {
    fn execute(&mut self, instruction: &str) -> Result<Option<String>, String>;
}

impl<F> Interpreter for F
where
    F: FnMut(&str) -> Result<Option<String>, String>,
{
    fn execute(&mut self, instruction: &str) -> Result<Option<String>, String> {
        self(instruction)
    }
}

/// Stand-in interpreter for checking a mailbox end to end.
///
/// `response$ = <expr>` answers `<expr>` with surrounding quotes removed,
/// `ERROR <text>` fails with `<text>`, and anything else is accepted as a
/// fire-and-forget instruction.
#[derive(Debug, Default)]
pub struct EchoInterpreter {
    history: Vec<String>,
}

impl EchoInterpreter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Instructions executed so far, oldest first.
    pub fn history(&self) -> &[String] {
        &self.history
    }
}

impl Interpreter for EchoInterpreter {
    fn execute(&mut self, instruction: &str) -> Result<Option<String>, String> {
        self.history.push(instruction.to_owned());

        if let Some(rest) = instruction.trim_start().strip_prefix("ERROR") {
            let diagnostic = rest.trim_start_matches(':').trim();
            return Err(if diagnostic.is_empty() {
                "instruction failed".to_owned()
            } else {
                diagnostic.to_owned()
            });
        }

        let instruction = Instruction::from(instruction);
        Ok(instruction
            .query_expression()
            .map(|expr| expr.trim().trim_matches('"').to_owned()))
    }
}
