//! The command script played to the console peer.
//!
//! The peer reads newline-terminated lines:
//!
//! - `WINR` opens the run dialog,
//! - `TYPE:<text>` types `<text>`,
//! - `ENTER` presses return.
//!
//! A script is a list of [`Step`]s executed by a [`Sequencer`]. Once the last
//! step has run the sequencer is [`State::Halted`]; on the device that is
//! followed by [`halt`].

use crate::delay::Settle;
use crate::usart::Transmit;

/// One console command.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Command {
    /// Open the run dialog.
    WinR,
    /// Type the given text.
    Type(&'static str),
    /// Press return.
    Enter,
}

impl Command {
    /// Send this command as one line.
    pub fn write_to<T: Transmit>(&self, tx: &mut T) {
        match self {
            Command::WinR => tx.transmit(b"WINR"),
            Command::Type(text) => {
                tx.transmit(b"TYPE:");
                tx.transmit(text.as_bytes());
            }
            Command::Enter => tx.transmit(b"ENTER"),
        }
        tx.transmit(b"\n");
    }
}

/// One entry of a script.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Step {
    /// Wait for the peer to catch up.
    Settle,
    /// Send a command.
    Send(Command),
}

/// The script run by the firmware: open a shell, write a file and open it in
/// an editor. Every command is preceded by a settle.
pub const REFERENCE: &[Step] = &[
    Step::Settle,
    Step::Send(Command::WinR),
    Step::Settle,
    Step::Send(Command::Type("cmd")),
    Step::Settle,
    Step::Send(Command::Enter),
    Step::Settle,
    Step::Send(Command::Type(
        "echo Hello world from outside world > file.txt",
    )),
    Step::Settle,
    Step::Send(Command::Enter),
    Step::Settle,
    Step::Send(Command::Type("code file.txt")),
    Step::Settle,
    Step::Send(Command::Enter),
];

/// Sequencer state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum State {
    /// Steps remain.
    Running,
    /// Every step has run. Terminal.
    Halted,
}

/// Plays a script one step at a time.
pub struct Sequencer<'a> {
    steps: &'a [Step],
    next: usize,
}

impl<'a> Sequencer<'a> {
    /// A sequencer positioned at the first step of `steps`.
    pub const fn new(steps: &'a [Step]) -> Self {
        Sequencer { steps, next: 0 }
    }

    /// Current state.
    pub fn state(&self) -> State {
        if self.next < self.steps.len() {
            State::Running
        } else {
            State::Halted
        }
    }

    /// Execute the next step, if any, and return the resulting state.
    pub fn step<T: Transmit, D: Settle>(&mut self, tx: &mut T, delay: &mut D) -> State {
        if let Some(step) = self.steps.get(self.next) {
            match step {
                Step::Settle => delay.settle(),
                Step::Send(cmd) => {
                    trace!("script: step {=usize} {}", self.next, cmd);
                    cmd.write_to(tx);
                }
            }
            self.next += 1;
        }
        self.state()
    }

    /// Execute every remaining step.
    pub fn run<T: Transmit, D: Settle>(&mut self, tx: &mut T, delay: &mut D) {
        while self.step(tx, delay) == State::Running {}
        info!("script: done after {=usize} steps", self.next);
    }
}

/// Park the core forever. This is the device's terminal state.
pub fn halt() -> ! {
    loop {
        core::hint::spin_loop();
    }
}

#[cfg(test)]
mod test {
    extern crate std;

    use std::cell::RefCell;
    use std::vec::Vec;

    use super::*;

    #[derive(Debug, PartialEq, Eq)]
    enum Event {
        Bytes(Vec<u8>),
        Settle,
    }

    /// Records transmit calls and settles on one timeline.
    struct Timeline(RefCell<Vec<Event>>);

    impl Timeline {
        fn new() -> Self {
            Timeline(RefCell::new(Vec::new()))
        }

        /// Everything transmitted, split on settles.
        fn lines(&self) -> Vec<Vec<u8>> {
            let mut out = Vec::new();
            for event in self.0.borrow().iter() {
                match event {
                    Event::Settle => out.push(Vec::new()),
                    Event::Bytes(b) => match out.last_mut() {
                        Some(line) => line.extend_from_slice(b),
                        None => out.push(b.clone()),
                    },
                }
            }
            out
        }
    }

    impl Transmit for &Timeline {
        fn transmit(&mut self, bytes: &[u8]) {
            self.0.borrow_mut().push(Event::Bytes(bytes.to_vec()));
        }
    }

    impl Settle for &Timeline {
        fn settle(&mut self) {
            self.0.borrow_mut().push(Event::Settle);
        }
    }

    #[test]
    fn reference_script_lines() {
        let timeline = Timeline::new();
        Sequencer::new(REFERENCE).run(&mut &timeline, &mut &timeline);

        let expected: [&[u8]; 7] = [
            b"WINR\n",
            b"TYPE:cmd\n",
            b"ENTER\n",
            b"TYPE:echo Hello world from outside world > file.txt\n",
            b"ENTER\n",
            b"TYPE:code file.txt\n",
            b"ENTER\n",
        ];
        assert_eq!(timeline.lines(), expected.map(|l| l.to_vec()));
    }

    #[test]
    fn settle_precedes_every_command() {
        let timeline = Timeline::new();
        Sequencer::new(REFERENCE).run(&mut &timeline, &mut &timeline);

        let events = timeline.0.borrow();
        assert_eq!(events.first(), Some(&Event::Settle));
        assert!(matches!(events.last(), Some(Event::Bytes(b)) if b == b"\n"));
        let settles = events.iter().filter(|e| **e == Event::Settle).count();
        assert_eq!(settles, 7);
    }

    #[test]
    fn stepping_reaches_halted_and_stays() {
        let timeline = Timeline::new();
        let mut seq = Sequencer::new(&[Step::Settle, Step::Send(Command::Enter)]);

        assert_eq!(seq.state(), State::Running);
        assert_eq!(seq.step(&mut &timeline, &mut &timeline), State::Running);
        assert_eq!(seq.step(&mut &timeline, &mut &timeline), State::Halted);
        assert_eq!(seq.step(&mut &timeline, &mut &timeline), State::Halted);
        assert_eq!(timeline.lines(), [b"ENTER\n".to_vec()]);
    }

    #[test]
    fn empty_script_is_halted() {
        assert_eq!(Sequencer::new(&[]).state(), State::Halted);
    }

    #[test]
    fn commands_drive_a_real_usart() {
        use crate::sim::{Capture, SimBus};
        use crate::usart::{Config, Usart};

        struct NoWait(usize);
        impl Settle for NoWait {
            fn settle(&mut self) {
                self.0 += 1;
            }
        }

        let mut usart = Usart::new(SimBus::new(Capture::<128>::new()), Config::REFERENCE);
        let mut delay = NoWait(0);
        Sequencer::new(REFERENCE).run(&mut usart, &mut delay);

        let mut bus = usart.free();
        bus.drain();
        assert_eq!(delay.0, 7);
        assert_eq!(bus.overruns(), 0);
        assert_eq!(
            bus.wire().bytes(),
            b"WINR\nTYPE:cmd\nENTER\nTYPE:echo Hello world from outside world > file.txt\n\
              ENTER\nTYPE:code file.txt\nENTER\n"
        );
    }
}
