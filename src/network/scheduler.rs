//! Single-threaded ready-queue scheduler for amplifier networks.
//!
//! Runs every VM on the calling thread without an async runtime. A VM
//! steps until it halts or needs input nobody has produced yet. It then
//! parks until a value lands on its input channel. When the ready queue
//! drains while VMs are still parked the network can never finish, and the
//! run fails with [`NetworkError::Deadlocked`] instead of hanging.

use crate::network::NetworkError;
use crate::network::amplifier::{Link, Wiring};
use crate::network::channel::Channel;
use crate::virtual_machine::program::Word;
use crate::virtual_machine::vm::{Event, VM};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

/// Runs a wired set of VMs to completion, one at a time.
pub struct CooperativeScheduler {
    vms: Vec<VM>,
    channels: Vec<Arc<Channel>>,
    links: Vec<Link>,
    /// Amplifiers able to make progress, in wake-up order.
    ready: VecDeque<usize>,
    /// Amplifiers parked on an empty input channel.
    waiting: Vec<bool>,
    /// Channel index to the amplifier reading it.
    readers: HashMap<usize, usize>,
}

impl CooperativeScheduler {
    /// Takes ownership of `vms`, where `vms[i]` is connected by
    /// `wiring.links[i]` to `channels`.
    pub fn new(vms: Vec<VM>, channels: Vec<Arc<Channel>>, wiring: &Wiring) -> Self {
        let readers = wiring
            .links
            .iter()
            .enumerate()
            .map(|(amplifier, link)| (link.input, amplifier))
            .collect();

        Self {
            ready: (0..vms.len()).collect(),
            waiting: vec![false; vms.len()],
            vms,
            channels,
            links: wiring.links.clone(),
            readers,
        }
    }

    /// Runs until every VM halts and returns the last value output by the
    /// last VM.
    pub fn run(mut self) -> Result<Word, NetworkError> {
        while let Some(amplifier) = self.ready.pop_front() {
            self.resume(amplifier)?;
        }

        let blocked = self.waiting.iter().filter(|&&waiting| waiting).count();
        if blocked > 0 {
            return Err(NetworkError::Deadlocked { blocked });
        }

        self.vms
            .last()
            .and_then(VM::last_output)
            .ok_or(NetworkError::NoOutput)
    }

    /// Steps one VM until it halts or parks on an empty input channel.
    fn resume(&mut self, amplifier: usize) -> Result<(), NetworkError> {
        let link = self.links[amplifier];
        loop {
            let event = self.vms[amplifier]
                .step()
                .map_err(|source| NetworkError::AmplifierFault { amplifier, source })?;

            match event {
                Event::Continue => {}
                Event::Output(value) => {
                    self.channels[link.output].put(value);
                    self.wake_reader(link.output);
                }
                Event::NeedsInput => match self.channels[link.input].try_get() {
                    Some(value) => self.vms[amplifier].provide_input(value),
                    None => {
                        self.waiting[amplifier] = true;
                        return Ok(());
                    }
                },
                Event::Halted => return Ok(()),
            }
        }
    }

    /// Moves the reader of `channel` back to the ready queue if it is parked.
    fn wake_reader(&mut self, channel: usize) {
        if let Some(&reader) = self.readers.get(&channel) {
            if self.waiting[reader] {
                self.waiting[reader] = false;
                self.ready.push_back(reader);
            }
        }
    }
}
