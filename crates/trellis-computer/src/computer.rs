//! The superstep loop.

use std::collections::HashMap;
use std::num::NonZeroUsize;

use indexmap::IndexMap;
use log::{debug, info, warn};
use rayon::ThreadPoolBuilder;
use rayon::iter::{IntoParallelRefMutIterator, ParallelIterator};
use trellis_core::{Element, GraphStore, Value, VertexId};

use crate::compute_key::ComputeKeys;
use crate::error::ComputerError;
use crate::memory::{Memory, MemoryPartial, MemorySnapshot};
use crate::program::{MasterContext, Termination, VertexContext, VertexProgram};

const DEFAULT_MAX_SUPERSTEPS: u32 = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComputerConfig {
    /// Worker threads, one partition each.
    pub workers: usize,
    pub max_supersteps: u32,
}

impl Default for ComputerConfig {
    fn default() -> Self {
        Self {
            workers: std::thread::available_parallelism().map_or(1, NonZeroUsize::get),
            max_supersteps: DEFAULT_MAX_SUPERSTEPS,
        }
    }
}

/// Outcome of a completed run.
#[derive(Debug, Clone, PartialEq)]
pub struct ComputerResult {
    pub memory: MemorySnapshot,
    /// Supersteps executed, counting superstep 0.
    pub supersteps: u32,
}

/// Runs vertex programs over a graph.
pub struct GraphComputer<'g> {
    graph: &'g (dyn GraphStore + Sync),
    config: ComputerConfig,
}

struct VertexState<M> {
    id: VertexId,
    state: IndexMap<String, Value>,
    active: bool,
    inbox: Vec<M>,
}

struct Partition<M> {
    vertices: Vec<VertexState<M>>,
}

struct Outcome<M> {
    partial: MemoryPartial,
    messages: Vec<(VertexId, M)>,
}

impl<M: Send> Partition<M> {
    fn run<P: VertexProgram<Message = M>>(
        &mut self,
        program: &P,
        graph: &(dyn GraphStore + Sync),
        keys: &ComputeKeys,
        memory: &Memory,
    ) -> Result<Outcome<M>, ComputerError> {
        let mut partial = MemoryPartial::default();
        let mut messages = Vec::new();
        for vertex in &mut self.vertices {
            if !vertex.active && vertex.inbox.is_empty() {
                continue;
            }
            let mut ctx = VertexContext {
                vertex: vertex.id,
                superstep: memory.superstep(),
                graph,
                keys,
                state: &mut vertex.state,
                messages: std::mem::take(&mut vertex.inbox),
                outbox: &mut messages,
                memory,
                partial: &mut partial,
                halted: false,
            };
            program.execute(&mut ctx)?;
            vertex.active = !ctx.halted;
        }
        Ok(Outcome { partial, messages })
    }

    fn active(&self) -> usize {
        self.vertices.iter().filter(|v| v.active).count()
    }
}

impl<'g> GraphComputer<'g> {
    pub fn new(graph: &'g (dyn GraphStore + Sync)) -> Self {
        Self::with_config(graph, ComputerConfig::default())
    }

    pub fn with_config(graph: &'g (dyn GraphStore + Sync), config: ComputerConfig) -> Self {
        Self { graph, config }
    }

    pub fn workers(mut self, workers: usize) -> Self {
        self.config.workers = workers;
        self
    }

    pub fn max_supersteps(mut self, max_supersteps: u32) -> Self {
        self.config.max_supersteps = max_supersteps;
        self
    }

    pub fn config(&self) -> ComputerConfig {
        self.config
    }

    /// Run `program` to termination.
    ///
    /// Persistent compute keys are written back as vertex properties only
    /// when the run completes; an aborted run leaves the graph untouched.
    pub fn submit<P: VertexProgram>(&self, program: &P) -> Result<ComputerResult, ComputerError> {
        match self.run(program) {
            Ok(result) => Ok(result),
            Err(e) => {
                warn!("vertex program aborted: {e}");
                Err(e)
            }
        }
    }

    fn run<P: VertexProgram>(&self, program: &P) -> Result<ComputerResult, ComputerError> {
        let keys = ComputeKeys::new(program.compute_keys())?;
        let mut memory = Memory::new(program.memory_keys());
        program.setup(&mut memory)?;

        let workers = self.config.workers.max(1);
        let vertices = self.graph.vertices(&[])?;
        let mut partitions: Vec<Partition<P::Message>> = (0..workers)
            .map(|_| Partition {
                vertices: Vec::new(),
            })
            .collect();
        // vertex -> (partition, slot)
        let mut routes = HashMap::with_capacity(vertices.len());
        for (i, id) in vertices.into_iter().enumerate() {
            let partition = &mut partitions[i % workers];
            routes.insert(id, (i % workers, partition.vertices.len()));
            partition.vertices.push(VertexState {
                id,
                state: IndexMap::new(),
                active: true,
                inbox: Vec::new(),
            });
        }
        let pool = ThreadPoolBuilder::new()
            .num_threads(workers)
            .build()
            .map_err(|e| ComputerError::ThreadPool(e.to_string()))?;
        info!(
            "vertex program started: {} vertices across {workers} workers",
            routes.len()
        );

        let mut superstep = 0;
        loop {
            if superstep >= self.config.max_supersteps {
                return Err(ComputerError::SuperstepLimit(self.config.max_supersteps));
            }
            memory.set_superstep(superstep);
            let outcomes: Vec<Result<Outcome<P::Message>, ComputerError>> = pool.install(|| {
                partitions
                    .par_iter_mut()
                    .map(|partition| partition.run(program, self.graph, &keys, &memory))
                    .collect()
            });

            let mut outbox = Vec::new();
            for outcome in outcomes {
                let outcome = outcome?;
                memory.merge(outcome.partial)?;
                outbox.extend(outcome.messages);
            }
            let active = partitions.iter().map(Partition::active).sum::<usize>();
            debug!(
                "superstep {superstep}: {} messages, {active} active vertices",
                outbox.len()
            );

            let mut master = MasterContext {
                superstep,
                memory: &mut memory,
                graph: self.graph,
                pending: outbox.len(),
                active,
                outbox: Vec::new(),
            };
            let decision = program.terminate(&mut master)?;
            outbox.extend(master.outbox);
            superstep += 1;

            if decision == Termination::Halt || (outbox.is_empty() && active == 0) {
                break;
            }
            for (to, message) in outbox {
                match routes.get(&to) {
                    Some(&(partition, slot)) => {
                        partitions[partition].vertices[slot].inbox.push(message);
                    }
                    None => debug!("dropping message to unknown vertex {to}"),
                }
            }
        }

        for partition in partitions {
            for vertex in partition.vertices {
                for (key, value) in vertex.state {
                    if keys.is_transient(&key) == Some(false) {
                        self.graph
                            .write_property(Element::Vertex(vertex.id), &key, value)?;
                    }
                }
            }
        }
        info!("vertex program finished after {superstep} supersteps");
        Ok(ComputerResult {
            memory: memory.into_snapshot(),
            supersteps: superstep,
        })
    }
}
