//! Per-user agent cache
//!
//! Agents are built outside the lock, so one slow MCP start-up never stalls
//! other users. When two messages from a new user race, the first insert wins
//! and the other agent is closed. The least recently used agent is closed once
//! the cache is full.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crypto_advisor::{LlmModel, McpMode, PumpPieAgent};
use tokio::sync::RwLock;

use crate::error::Result;

struct CachedAgent {
    agent: Arc<PumpPieAgent>,
    last_used: AtomicU64,
}

impl CachedAgent {
    fn touch(&self, now: u64) {
        self.last_used.fetch_max(now, Ordering::Relaxed);
    }
}

pub struct AgentDirectory {
    llm: LlmModel,
    mcp_mode: McpMode,
    capacity: usize,

    /// Logical clock for recency
    clock: AtomicU64,
    agents: RwLock<HashMap<i64, CachedAgent>>,
}

impl AgentDirectory {
    pub fn new(llm: LlmModel, mcp_mode: McpMode, capacity: usize) -> Self {
        Self {
            llm,
            mcp_mode,
            capacity: capacity.max(1),
            clock: AtomicU64::new(0),
            agents: RwLock::new(HashMap::new()),
        }
    }

    fn tick(&self) -> u64 {
        self.clock.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// The user's agent, created on first use
    pub async fn get(&self, user_id: i64) -> Result<Arc<PumpPieAgent>> {
        if let Some(entry) = self.agents.read().await.get(&user_id) {
            entry.touch(self.tick());
            return Ok(Arc::clone(&entry.agent));
        }

        let agent = Arc::new(PumpPieAgent::new(user_id, self.llm, None, self.mcp_mode).await?);

        let mut agents = self.agents.write().await;
        let now = self.tick();

        if let Some(existing) = agents.get(&user_id) {
            existing.touch(now);
            let existing = Arc::clone(&existing.agent);
            drop(agents);
            agent.close().await;
            return Ok(existing);
        }

        let evicted = if agents.len() >= self.capacity {
            least_recent(&agents).and_then(|id| agents.remove(&id).map(|entry| (id, entry)))
        } else {
            None
        };

        agents.insert(
            user_id,
            CachedAgent {
                agent: Arc::clone(&agent),
                last_used: AtomicU64::new(now),
            },
        );
        let active_agents = agents.len();
        drop(agents);

        tracing::info!(user_id, active_agents, "Agent created");
        if let Some((evicted_id, entry)) = evicted {
            tracing::info!(user_id = evicted_id, "Agent evicted");
            entry.agent.close().await;
        }

        Ok(agent)
    }

    /// Close and forget every agent, returning how many there were
    pub async fn close_all(&self) -> usize {
        let agents: Vec<_> = self.agents.write().await.drain().map(|(_, e)| e.agent).collect();
        for agent in &agents {
            agent.close().await;
        }
        agents.len()
    }
}

fn least_recent(agents: &HashMap<i64, CachedAgent>) -> Option<i64> {
    agents
        .iter()
        .min_by_key(|(_, entry)| entry.last_used.load(Ordering::Relaxed))
        .map(|(id, _)| *id)
}
