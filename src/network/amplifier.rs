//! Amplifier network: one VM per phase setting, chained through channels.
//!
//! Every amplifier runs its own copy of the same program. Amplifier `i`
//! first reads its phase setting, then consumes signals from its input
//! channel and sends results downstream. In a [`Topology::Feedback`] ring
//! the last amplifier feeds the first until every amplifier halts.
//!
//! The network result is the last value output by the last amplifier.
//! [`AmplifierNetwork::max_signal`] tries every ordering of the phase
//! settings and keeps the strongest result.

use crate::network::NetworkError;
use crate::network::channel::Channel;
use crate::network::scheduler::CooperativeScheduler;
use crate::virtual_machine::program::{Program, Word};
use crate::virtual_machine::vm::VM;
use crate::{debug, info, warn};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::task::JoinSet;

/// How amplifier outputs are connected.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum Topology {
    /// `A -> B -> ... -> E`; the last amplifier writes to a sink.
    #[default]
    Linear,
    /// `A -> B -> ... -> E -> A`; the last amplifier feeds the first.
    Feedback,
}

/// How the amplifier VMs are executed.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum Scheduler {
    /// One tokio task per amplifier, suspended while its input is empty.
    #[default]
    Tasks,
    /// A single-threaded ready queue; see [`CooperativeScheduler`].
    Cooperative,
}

/// Network settings.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct NetworkConfig {
    pub topology: Topology,
    /// Signal delivered to the first amplifier after its phase setting.
    pub seed_signal: Word,
    pub scheduler: Scheduler,
}

impl NetworkConfig {
    pub fn linear() -> Self {
        Self::default()
    }

    pub fn feedback() -> Self {
        Self {
            topology: Topology::Feedback,
            ..Self::default()
        }
    }

    pub fn with_seed_signal(mut self, seed_signal: Word) -> Self {
        self.seed_signal = seed_signal;
        self
    }

    pub fn with_scheduler(mut self, scheduler: Scheduler) -> Self {
        self.scheduler = scheduler;
        self
    }
}

/// Channel indices one amplifier reads from and writes to.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Link {
    pub input: usize,
    pub output: usize,
}

/// Directed channel graph of a network.
///
/// Amplifier `i` always reads channel `i`. In a linear chain it writes
/// channel `i + 1` and channel `k` is the sink; in a feedback ring it writes
/// channel `(i + 1) % k` and the sink is channel 0.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Wiring {
    /// Number of channels.
    pub channels: usize,
    /// Links indexed by amplifier.
    pub links: Vec<Link>,
    /// Channel that receives the last amplifier's output.
    pub sink: usize,
}

impl Wiring {
    /// Builds the graph for `amplifiers` amplifiers.
    pub fn build(topology: Topology, amplifiers: usize) -> Self {
        match topology {
            Topology::Linear => Self {
                channels: amplifiers + 1,
                links: (0..amplifiers)
                    .map(|i| Link {
                        input: i,
                        output: i + 1,
                    })
                    .collect(),
                sink: amplifiers,
            },
            Topology::Feedback => Self {
                channels: amplifiers,
                links: (0..amplifiers)
                    .map(|i| Link {
                        input: i,
                        output: (i + 1) % amplifiers,
                    })
                    .collect(),
                sink: 0,
            },
        }
    }

    /// Allocates one empty channel per graph node.
    pub fn allocate(&self) -> Vec<Arc<Channel>> {
        (0..self.channels).map(|_| Channel::shared()).collect()
    }
}

/// Best result found by [`AmplifierNetwork::search`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct BestSignal {
    pub signal: Word,
    /// Phase ordering that produced `signal`.
    pub phases: Vec<Word>,
}

/// VMs of one run, wired and seeded, ready to execute.
struct Prepared {
    vms: Vec<VM>,
    channels: Vec<Arc<Channel>>,
    wiring: Wiring,
}

/// Runs a program as a chain of amplifiers.
#[derive(Clone, Debug)]
pub struct AmplifierNetwork {
    program: Program,
    config: NetworkConfig,
}

impl AmplifierNetwork {
    pub fn new(program: Program, config: NetworkConfig) -> Self {
        Self { program, config }
    }

    pub fn config(&self) -> &NetworkConfig {
        &self.config
    }

    /// Runs one amplifier per entry of `phases`, in order.
    ///
    /// Returns the last value output by the last amplifier. Fails if the
    /// phases are empty or repeated, if any amplifier faults, or if the last
    /// amplifier never outputs.
    pub async fn run(&self, phases: &[Word]) -> Result<Word, NetworkError> {
        match self.config.scheduler {
            Scheduler::Tasks => {
                let prepared = self.prepare(phases)?;
                Self::run_tasks(prepared.vms).await
            }
            Scheduler::Cooperative => self.run_cooperative(phases),
        }
    }

    /// Runs the network on the calling thread with a [`CooperativeScheduler`],
    /// whatever the configured scheduler is.
    pub fn run_cooperative(&self, phases: &[Word]) -> Result<Word, NetworkError> {
        let prepared = self.prepare(phases)?;
        CooperativeScheduler::new(prepared.vms, prepared.channels, &prepared.wiring).run()
    }

    /// Tries every ordering of `phases` and returns the strongest signal.
    ///
    /// Stops at the first ordering that fails.
    pub async fn search(&self, phases: &[Word]) -> Result<BestSignal, NetworkError> {
        validate_phases(phases)?;

        let mut best: Option<BestSignal> = None;
        for ordering in permutations(phases) {
            let signal = match self.run(&ordering).await {
                Ok(signal) => signal,
                Err(err) => {
                    warn!("phases {:?} failed: {}", ordering, err);
                    return Err(err);
                }
            };
            debug!("phases {:?} -> {}", ordering, signal);

            if best.as_ref().is_none_or(|b| signal > b.signal) {
                best = Some(BestSignal {
                    signal,
                    phases: ordering,
                });
            }
        }

        // At least one ordering exists for a validated, non-empty set.
        let best = best.ok_or(NetworkError::EmptyPhaseSet)?;
        info!(
            "max signal {} with phases {:?} ({:?})",
            best.signal, best.phases, self.config.topology
        );
        Ok(best)
    }

    /// Maximum signal over every ordering of `phases`.
    pub async fn max_signal(&self, phases: &[Word]) -> Result<Word, NetworkError> {
        self.search(phases).await.map(|best| best.signal)
    }

    /// Builds fresh VMs and channels for one run.
    ///
    /// Every channel `i` is seeded with `phases[i]`, and channel 0 then gets
    /// the seed signal, before any VM executes.
    fn prepare(&self, phases: &[Word]) -> Result<Prepared, NetworkError> {
        validate_phases(phases)?;

        let wiring = Wiring::build(self.config.topology, phases.len());
        let channels = wiring.allocate();
        for (channel, &phase) in channels.iter().zip(phases) {
            channel.put(phase);
        }
        channels[0].put(self.config.seed_signal);

        let vms = wiring
            .links
            .iter()
            .map(|link| {
                let mut vm = VM::new(&self.program);
                vm.wire(channels[link.input].clone(), channels[link.output].clone());
                vm
            })
            .collect();

        Ok(Prepared {
            vms,
            channels,
            wiring,
        })
    }

    /// Runs each VM in its own task until all of them halt.
    ///
    /// A fault aborts the remaining tasks, which would otherwise wait forever
    /// on channels nobody writes to.
    async fn run_tasks(vms: Vec<VM>) -> Result<Word, NetworkError> {
        let last = vms.len().saturating_sub(1);
        let mut tasks = JoinSet::new();
        for (amplifier, mut vm) in vms.into_iter().enumerate() {
            tasks.spawn(async move {
                let result = vm.run().await;
                (amplifier, result.map(|_| vm.last_output()))
            });
        }

        let mut signal = None;
        while let Some(joined) = tasks.join_next().await {
            let (amplifier, result) = match joined {
                Ok(done) => done,
                Err(err) => {
                    tasks.abort_all();
                    return Err(NetworkError::TaskFailed {
                        reason: err.to_string(),
                    });
                }
            };
            match result {
                Ok(output) if amplifier == last => signal = output,
                Ok(_) => {}
                Err(source) => {
                    tasks.abort_all();
                    return Err(NetworkError::AmplifierFault { amplifier, source });
                }
            }
        }

        signal.ok_or(NetworkError::NoOutput)
    }
}

/// Maximum thruster signal of `program` over every ordering of `phases`,
/// with the last amplifier feeding the first when `feedback` is set.
pub async fn max_signal(
    program: &Program,
    phases: &[Word],
    feedback: bool,
) -> Result<Word, NetworkError> {
    let config = if feedback {
        NetworkConfig::feedback()
    } else {
        NetworkConfig::linear()
    };
    AmplifierNetwork::new(program.clone(), config)
        .max_signal(phases)
        .await
}

/// Rejects empty phase sets and repeated phase settings.
pub fn validate_phases(phases: &[Word]) -> Result<(), NetworkError> {
    if phases.is_empty() {
        return Err(NetworkError::EmptyPhaseSet);
    }
    let mut seen = HashSet::with_capacity(phases.len());
    for &phase in phases {
        if !seen.insert(phase) {
            return Err(NetworkError::DuplicatePhase { phase });
        }
    }
    Ok(())
}

/// All orderings of `items`, generated with Heap's algorithm.
///
/// The first ordering is `items` itself. Yields `n!` orderings, so a single
/// empty ordering for empty input.
pub fn permutations(items: &[Word]) -> Vec<Vec<Word>> {
    let mut items = items.to_vec();
    let mut counters = vec![0usize; items.len()];
    let mut orderings = vec![items.clone()];

    let mut i = 1;
    while i < items.len() {
        if counters[i] < i {
            let j = if i % 2 == 0 { 0 } else { counters[i] };
            items.swap(j, i);
            orderings.push(items.clone());
            counters[i] += 1;
            i = 1;
        } else {
            counters[i] = 0;
            i += 1;
        }
    }

    orderings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::utils::{
        ECHO, FEEDBACK_18216, FEEDBACK_139629729, LINEAR_43210, LINEAR_54321, LINEAR_65210,
        LOOP_OR_FAULT, SWALLOW, program,
    };
    use crate::virtual_machine::errors::VMError;
    use std::error::Error as _;

    fn linear(source: &str) -> AmplifierNetwork {
        AmplifierNetwork::new(program(source), NetworkConfig::linear())
    }

    fn feedback(source: &str) -> AmplifierNetwork {
        AmplifierNetwork::new(program(source), NetworkConfig::feedback())
    }

    #[test]
    fn permutations_are_complete_and_distinct() {
        let orderings = permutations(&[0, 1, 2, 3, 4]);
        assert_eq!(orderings.len(), 120);
        assert_eq!(orderings[0], vec![0, 1, 2, 3, 4]);

        let distinct: HashSet<_> = orderings.iter().collect();
        assert_eq!(distinct.len(), 120);
        for ordering in &orderings {
            let mut sorted = ordering.clone();
            sorted.sort();
            assert_eq!(sorted, vec![0, 1, 2, 3, 4]);
        }
    }

    #[test]
    fn permutations_of_small_sets() {
        assert_eq!(permutations(&[7]), vec![vec![7]]);
        assert_eq!(permutations(&[1, 2]), vec![vec![1, 2], vec![2, 1]]);
        assert_eq!(permutations(&[]), vec![Vec::<Word>::new()]);
    }

    #[test]
    fn linear_wiring() {
        let wiring = Wiring::build(Topology::Linear, 3);
        assert_eq!(wiring.channels, 4);
        assert_eq!(wiring.sink, 3);
        assert_eq!(
            wiring.links,
            vec![
                Link {
                    input: 0,
                    output: 1
                },
                Link {
                    input: 1,
                    output: 2
                },
                Link {
                    input: 2,
                    output: 3
                },
            ]
        );
    }

    #[test]
    fn feedback_wiring_closes_the_ring() {
        let wiring = Wiring::build(Topology::Feedback, 5);
        assert_eq!(wiring.channels, 5);
        assert_eq!(wiring.sink, 0);
        assert_eq!(
            wiring.links[4],
            Link {
                input: 4,
                output: 0
            }
        );

        let single = Wiring::build(Topology::Feedback, 1);
        assert_eq!(
            single.links,
            vec![Link {
                input: 0,
                output: 0
            }]
        );
    }

    #[test]
    fn config_builders() {
        let config = NetworkConfig::feedback()
            .with_seed_signal(3)
            .with_scheduler(Scheduler::Cooperative);
        assert_eq!(config.topology, Topology::Feedback);
        assert_eq!(config.seed_signal, 3);
        assert_eq!(config.scheduler, Scheduler::Cooperative);
        assert_eq!(NetworkConfig::default(), NetworkConfig::linear());
    }

    #[test]
    fn phases_are_validated() {
        assert_eq!(validate_phases(&[]), Err(NetworkError::EmptyPhaseSet));
        assert_eq!(
            validate_phases(&[0, 1, 0]),
            Err(NetworkError::DuplicatePhase { phase: 0 })
        );
        assert_eq!(validate_phases(&[4, 3, 2, 1, 0]), Ok(()));
    }

    #[test]
    fn prepare_seeds_before_start() {
        let network = AmplifierNetwork::new(
            program(LINEAR_43210),
            NetworkConfig::linear().with_seed_signal(11),
        );
        let prepared = network.prepare(&[4, 3, 2]).unwrap();

        assert_eq!(prepared.channels.len(), 4);
        assert_eq!(prepared.channels[0].drain(), vec![4, 11]);
        assert_eq!(prepared.channels[1].drain(), vec![3]);
        assert_eq!(prepared.channels[2].drain(), vec![2]);
        assert!(prepared.channels[3].is_empty());
        assert!(prepared.vms.iter().all(|vm| vm.steps() == 0));
    }

    #[tokio::test]
    async fn linear_run_with_given_phases() {
        assert_eq!(linear(LINEAR_43210).run(&[4, 3, 2, 1, 0]).await, Ok(43210));
        assert_eq!(linear(LINEAR_54321).run(&[0, 1, 2, 3, 4]).await, Ok(54321));
        assert_eq!(linear(LINEAR_65210).run(&[1, 0, 4, 3, 2]).await, Ok(65210));
    }

    #[tokio::test]
    async fn linear_max_signal() {
        let phases = [0, 1, 2, 3, 4];
        assert_eq!(linear(LINEAR_43210).max_signal(&phases).await, Ok(43210));
        assert_eq!(linear(LINEAR_54321).max_signal(&phases).await, Ok(54321));

        assert_eq!(linear(LINEAR_65210).max_signal(&phases).await, Ok(65210));

        let best = linear(LINEAR_43210).search(&phases).await.unwrap();
        assert_eq!(best.signal, 43210);
        assert_eq!(best.phases, vec![4, 3, 2, 1, 0]);
    }

    #[tokio::test]
    async fn feedback_run_with_given_phases() {
        assert_eq!(
            feedback(FEEDBACK_139629729).run(&[9, 8, 7, 6, 5]).await,
            Ok(139629729)
        );
        assert_eq!(
            feedback(FEEDBACK_18216).run(&[9, 7, 8, 5, 6]).await,
            Ok(18216)
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn feedback_max_signal() {
        let phases = [5, 6, 7, 8, 9];
        assert_eq!(
            feedback(FEEDBACK_139629729).max_signal(&phases).await,
            Ok(139629729)
        );

        assert_eq!(
            max_signal(&program(FEEDBACK_18216), &phases, true).await,
            Ok(18216)
        );
    }

    #[tokio::test]
    async fn free_max_signal_linear() {
        assert_eq!(
            max_signal(&program(LINEAR_43210), &[0, 1, 2, 3, 4], false).await,
            Ok(43210)
        );
    }

    #[tokio::test]
    async fn schedulers_agree() {
        let cases = [
            (LINEAR_43210, Topology::Linear, vec![4, 3, 2, 1, 0]),
            (LINEAR_54321, Topology::Linear, vec![0, 1, 2, 3, 4]),
            (LINEAR_65210, Topology::Linear, vec![1, 0, 4, 3, 2]),
            (FEEDBACK_139629729, Topology::Feedback, vec![9, 8, 7, 6, 5]),
            (FEEDBACK_18216, Topology::Feedback, vec![9, 7, 8, 5, 6]),
        ];

        for (source, topology, phases) in cases {
            let config = NetworkConfig {
                topology,
                ..NetworkConfig::default()
            };
            let tasks = AmplifierNetwork::new(program(source), config);
            let cooperative = AmplifierNetwork::new(
                program(source),
                config.with_scheduler(Scheduler::Cooperative),
            );

            let expected = tasks.run(&phases).await.unwrap();
            assert_eq!(cooperative.run(&phases).await, Ok(expected));
            assert_eq!(tasks.run_cooperative(&phases), Ok(expected));
        }
    }

    #[tokio::test]
    async fn runs_are_independent() {
        let network = feedback(FEEDBACK_139629729);
        let first = network.run(&[9, 8, 7, 6, 5]).await;
        let second = network.run(&[9, 8, 7, 6, 5]).await;
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn fault_aborts_blocked_amplifiers() {
        // Phase 0 keeps reading input forever; phase 1 jumps to opcode 42.
        let network = AmplifierNetwork::new(program(LOOP_OR_FAULT), NetworkConfig::feedback());

        let err = network.run(&[0, 1]).await.unwrap_err();
        assert_eq!(
            err,
            NetworkError::AmplifierFault {
                amplifier: 1,
                source: VMError::InvalidOpcode {
                    opcode: 42,
                    offset: 10
                },
            }
        );
        assert!(err.source().is_some());
        assert_eq!(
            err.to_string(),
            "amplifier 1 faulted: malformed instruction: unknown opcode 42 at offset 10"
        );
    }

    #[tokio::test]
    async fn search_stops_at_failing_permutation() {
        // The phase setting is executed as the next instruction.
        let network = linear("3,2,0");
        assert!(matches!(
            network.search(&[99, 1]).await,
            Err(NetworkError::AmplifierFault { .. })
        ));
    }

    #[tokio::test]
    async fn rejects_bad_phase_sets() {
        let network = linear(LINEAR_43210);
        assert_eq!(network.run(&[]).await, Err(NetworkError::EmptyPhaseSet));
        assert_eq!(
            network.max_signal(&[1, 1]).await,
            Err(NetworkError::DuplicatePhase { phase: 1 })
        );
    }

    #[tokio::test]
    async fn last_amplifier_without_output() {
        let network = AmplifierNetwork::new(Program::from(&SWALLOW[..]), NetworkConfig::linear());
        assert_eq!(network.run(&[1]).await, Err(NetworkError::NoOutput));
    }

    #[tokio::test]
    async fn single_amplifier_ring_feeds_itself() {
        // Echoes three inputs: phase, seed, then its own first output.
        let network = AmplifierNetwork::new(
            program("3,13,4,13,3,13,4,13,3,13,4,13,99,0"),
            NetworkConfig::feedback().with_seed_signal(5),
        );
        assert_eq!(network.run(&[8]).await, Ok(8));

        let echo = AmplifierNetwork::new(Program::from(&ECHO[..]), NetworkConfig::linear());
        assert_eq!(echo.run(&[6]).await, Ok(6));
    }
}
