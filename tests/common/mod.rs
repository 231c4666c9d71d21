#![allow(dead_code)]

use std::cell::RefCell;
use std::io::{self, Write};
use std::rc::Rc;

use rox::report::CollectingReporter;
use rox::{Lox, Status};

/// `Write` sink whose contents stay readable after the session took it.
#[derive(Clone, Default)]
pub struct SharedBuf(Rc<RefCell<Vec<u8>>>);

impl SharedBuf {
    pub fn contents(&self) -> String {
        String::from_utf8(self.0.borrow().clone()).expect("output is UTF-8")
    }
}

impl Write for SharedBuf {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

pub struct Session {
    pub lox: Lox,
    pub out: SharedBuf,
    pub reports: Rc<RefCell<CollectingReporter>>,
}

impl Session {
    pub fn new() -> Self {
        let out = SharedBuf::default();
        let reports = Rc::new(RefCell::new(CollectingReporter::new()));
        let lox = Lox::with_io(Box::new(out.clone()), Box::new(Rc::clone(&reports)));

        Self { lox, out, reports }
    }

    pub fn run(&mut self, source: &str) -> Status {
        self.lox.run(source)
    }

    pub fn output(&self) -> String {
        self.out.contents()
    }

    pub fn diagnostics(&self) -> Vec<String> {
        self.reports.borrow().messages.clone()
    }
}

/// One-shot run: status, stdout, diagnostics.
pub fn run(source: &str) -> (Status, String, Vec<String>) {
    let mut session = Session::new();
    let status = session.run(source);
    (status, session.output(), session.diagnostics())
}
