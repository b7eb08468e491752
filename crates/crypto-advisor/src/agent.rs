//! PumpPie agent
//!
//! One [`PumpPieAgent`] per Telegram user. It owns four specialized agents
//! that share the user's tool servers:
//!
//! ```text
//! PumpPieAgent
//! ├── conversation ──► AgentResponseOutput
//! ├── dca          ──► DCAStrategyOutput
//! ├── portfolio    ──► PortfolioStatusOutput
//! └── market       ──► MarketAnalysisOutput
//! ```
//!
//! With the `test` model no tools are connected and every operation returns
//! fixed data without calling a provider.

use std::sync::Arc;

use agent_core::{
    Agent, AgentBuilder, GenerationOptions, LlmProvider, StructuredOutput, ToolRegistry,
};
use agent_mcp::{
    McpMode, McpServerSpec, McpToolset, RecommendedSetup, ServerCapabilities, get_mcp_servers,
};
use agent_runtime::{LlmModel, provider_for};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;
use serde_json::{Map, Value};
use tokio::sync::Mutex;

use crate::config::AgentConfig;
use crate::dependencies::{AgentDependencies, strategy_id};
use crate::error::{AdvisorError, Result};
use crate::outputs::{
    AgentResponseOutput, DCAStrategyOutput, DcaInterval, InvestmentRecommendation,
    MarketAnalysisOutput, PortfolioStatusOutput, RiskLevel, TrendDirection, plan_totals,
};
use crate::prompts::{AgentRole, system_prompt};

/// Which specialized agents were built
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AgentsInitialized {
    pub conversation: bool,
    pub dca: bool,
    pub portfolio: bool,
    pub market: bool,
}

impl AgentsInitialized {
    pub const fn all(&self) -> bool {
        self.conversation && self.dca && self.portfolio && self.market
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct McpServersStatus {
    pub count: usize,
    pub capabilities: ServerCapabilities,
    pub servers: Vec<McpServerSpec>,
}

#[derive(Clone, Debug, Serialize)]
pub struct HealthStatus {
    pub user_id: i64,
    pub model: LlmModel,
    pub mcp_mode: McpMode,
    pub agents_initialized: AgentsInitialized,
    pub mcp_servers: McpServersStatus,
    pub config: Map<String, Value>,
    pub status: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct SetupInfo {
    pub mcp_mode: McpMode,
    pub active_servers: usize,
    pub server_list: Vec<McpServerSpec>,
    pub server_capabilities: ServerCapabilities,
    pub recommended_setup: RecommendedSetup,
}

pub struct PumpPieAgent {
    user_id: i64,
    llm: LlmModel,
    llm_config: Map<String, Value>,
    mcp_mode: McpMode,
    config: AgentConfig,
    deps: AgentDependencies,

    capabilities: ServerCapabilities,
    recommended_setup: RecommendedSetup,
    servers: Vec<McpServerSpec>,
    toolset: Mutex<McpToolset>,

    conversation: Agent<AgentResponseOutput>,
    dca: Agent<DCAStrategyOutput>,
    portfolio: Agent<PortfolioStatusOutput>,
    market: Agent<MarketAnalysisOutput>,
}

impl PumpPieAgent {
    /// Build the agent for a user.
    ///
    /// `llm_config` may override `temperature`, `max_tokens` and
    /// `max_iterations`. Servers that fail to start are skipped.
    pub async fn new(
        user_id: i64,
        llm: LlmModel,
        llm_config: Option<Map<String, Value>>,
        mcp_mode: McpMode,
    ) -> Result<Self> {
        Self::with_provider(user_id, llm, provider_for(llm)?, llm_config, mcp_mode).await
    }

    /// Build the agent on a given provider. `llm` still selects between the
    /// fixed test responses and live agent calls.
    pub async fn with_provider(
        user_id: i64,
        llm: LlmModel,
        provider: Arc<dyn LlmProvider>,
        llm_config: Option<Map<String, Value>>,
        mcp_mode: McpMode,
    ) -> Result<Self> {
        let llm_config = llm_config.unwrap_or_default();

        let capabilities = ServerCapabilities::for_mode(mcp_mode).await;
        let recommended_setup = capabilities.recommended_setup();
        let servers = get_mcp_servers(user_id, mcp_mode, capabilities.nodejs);

        let toolset = if llm.is_test() {
            McpToolset::default()
        } else {
            McpToolset::connect(&servers).await
        };

        let prompt = |role| system_prompt(role, mcp_mode, &toolset.active_prefixes());
        let factory = AgentFactory {
            provider,
            tools: Arc::new(toolset.registry()),
            generation: generation_options(llm, &llm_config),
            max_iterations: llm_config
                .get("max_iterations")
                .and_then(Value::as_u64)
                .and_then(|n| usize::try_from(n).ok()),
        };

        let conversation = factory.build(AgentRole::Conversation, prompt(AgentRole::Conversation))?;
        let dca = factory.build(AgentRole::Dca, prompt(AgentRole::Dca))?;
        let portfolio = factory.build(AgentRole::Portfolio, prompt(AgentRole::Portfolio))?;
        let market = factory.build(AgentRole::Market, prompt(AgentRole::Market))?;

        tracing::info!(
            user_id,
            model = %llm,
            mcp_mode = %mcp_mode,
            servers = servers.len(),
            tools = toolset.tools().len(),
            "PumpPie agent initialized"
        );

        Ok(Self {
            user_id,
            llm,
            llm_config,
            mcp_mode,
            config: AgentConfig::create_default(user_id),
            deps: AgentDependencies::new(user_id),
            capabilities,
            recommended_setup,
            servers,
            toolset: Mutex::new(toolset),
            conversation,
            dca,
            portfolio,
            market,
        })
    }

    /// Offline agent with no tool servers
    pub async fn test(user_id: i64) -> Result<Self> {
        Self::new(user_id, LlmModel::Test, None, McpMode::Test).await
    }

    pub const fn user_id(&self) -> i64 {
        self.user_id
    }

    pub const fn llm(&self) -> LlmModel {
        self.llm
    }

    pub const fn mcp_mode(&self) -> McpMode {
        self.mcp_mode
    }

    pub const fn config(&self) -> &AgentConfig {
        &self.config
    }

    /// Answer a chat message. Never fails; errors become an apology.
    pub async fn process_message(&self, message: &str) -> String {
        if self.llm.is_test() {
            return format!("Test response to: {message}");
        }

        match self.conversation.run(message).await {
            Ok(output) => output.response,
            Err(e) => {
                tracing::error!(user_id = self.user_id, error = %e, "Error processing message");
                format!("Sorry, I encountered an error: {e}")
            }
        }
    }

    pub async fn create_dca_strategy(
        &self,
        asset: &str,
        amount: Decimal,
        interval: DcaInterval,
        duration_months: u32,
    ) -> Result<DCAStrategyOutput> {
        if self.llm.is_test() {
            let (expected_purchases, total_investment) = plan_totals(amount, duration_months);
            return Ok(DCAStrategyOutput {
                strategy_id: strategy_id(self.user_id, asset),
                asset: asset.to_string(),
                amount_per_interval: amount,
                interval,
                duration_months,
                current_price: dec!(50000.00),
                risk_assessment: RiskLevel::Moderate,
                recommendation: InvestmentRecommendation::Buy,
                total_investment,
                expected_purchases,
                entry_conditions: vec!["Market conditions favorable".into()],
                exit_conditions: vec!["Reach target allocation".into()],
                stop_loss_threshold: None,
                take_profit_threshold: None,
                explanation: format!("Test DCA strategy for {asset}"),
                warnings: vec!["This is a test strategy".into()],
            });
        }

        let result = async {
            self.config.dca_config.check_request(amount, interval)?;
            let prompt = format!(
                "Create a DCA strategy for {asset} with {amount} {interval} for {duration_months} months"
            );
            let strategy = self.dca.run(&prompt).await?;
            self.deps.save_dca_strategy(&strategy.asset).await;
            Ok::<_, AdvisorError>(strategy)
        }
        .await;

        if let Err(e) = &result {
            tracing::error!(user_id = self.user_id, asset, error = %e, "Error creating DCA strategy");
        }
        result
    }

    pub async fn get_portfolio_status(&self) -> Result<PortfolioStatusOutput> {
        if self.llm.is_test() {
            return Ok(PortfolioStatusOutput {
                total_value: dec!(10000.00),
                total_invested: dec!(8500.00),
                total_pnl: dec!(1500.00),
                total_pnl_percentage: dec!(17.65),
                positions: Vec::new(),
                position_count: 0,
                active_strategies: Vec::new(),
                strategy_count: 0,
                portfolio_risk: RiskLevel::Moderate,
                diversification_score: 0.65,
                largest_position_percentage: dec!(0.00),
                recommendations: vec!["Test recommendation".into()],
                warnings: Vec::new(),
                analysis_summary: "Test portfolio analysis".into(),
            });
        }

        self.portfolio
            .run("Analyze my portfolio status")
            .await
            .map_err(|e| {
                tracing::error!(user_id = self.user_id, error = %e, "Error getting portfolio status");
                e.into()
            })
    }

    pub async fn get_market_analysis(&self, asset: &str) -> Result<MarketAnalysisOutput> {
        if self.llm.is_test() {
            return Ok(MarketAnalysisOutput {
                asset: asset.to_string(),
                current_price: dec!(50000.00),
                price_change_24h: dec!(2.5),
                volume_24h: dec!(25000000000),
                market_cap: Some(dec!(1000000000000)),
                trend_direction: TrendDirection::Bullish,
                trend_strength: 0.75,
                volatility: dec!(4.2),
                technical_indicators: Vec::new(),
                support_levels: Vec::new(),
                resistance_levels: Vec::new(),
                investment_recommendation: InvestmentRecommendation::Buy,
                dca_suitability: RiskLevel::Moderate,
                optimal_entry_range: MarketAnalysisOutput::entry_range(dec!(48000), dec!(52000)),
                risk_factors: vec!["Test risk".into()],
                opportunity_factors: vec!["Test opportunity".into()],
                best_entry_timing: "Current levels favorable".into(),
                market_sentiment: "Optimistic".into(),
                detailed_analysis: format!("Test analysis for {asset}"),
                confidence_score: 0.8,
            });
        }

        self.market
            .run(&format!("Analyze the market for {asset}"))
            .await
            .map_err(|e| {
                tracing::error!(user_id = self.user_id, asset, error = %e, "Error getting market analysis");
                e.into()
            })
    }

    pub fn setup_info(&self) -> SetupInfo {
        SetupInfo {
            mcp_mode: self.mcp_mode,
            active_servers: self.servers.len(),
            server_list: self.servers.clone(),
            server_capabilities: self.capabilities.clone(),
            recommended_setup: self.recommended_setup.clone(),
        }
    }

    pub fn health_check(&self) -> HealthStatus {
        let setup = self.setup_info();

        HealthStatus {
            user_id: self.user_id,
            model: self.llm,
            mcp_mode: self.mcp_mode,
            agents_initialized: AgentsInitialized {
                conversation: self.conversation.output_schema() == AgentResponseOutput::SCHEMA_NAME,
                dca: self.dca.output_schema() == DCAStrategyOutput::SCHEMA_NAME,
                portfolio: self.portfolio.output_schema() == PortfolioStatusOutput::SCHEMA_NAME,
                market: self.market.output_schema() == MarketAnalysisOutput::SCHEMA_NAME,
            },
            mcp_servers: McpServersStatus {
                count: setup.active_servers,
                capabilities: setup.server_capabilities,
                servers: setup.server_list,
            },
            config: self.llm_config.clone(),
            status: "healthy".into(),
        }
    }

    /// Stop every tool server process
    pub async fn close(&self) {
        self.toolset.lock().await.close().await;
        tracing::debug!(user_id = self.user_id, "PumpPie agent closed");
    }
}

/// Shared pieces of the four specialized agents
struct AgentFactory {
    provider: Arc<dyn LlmProvider>,
    tools: Arc<ToolRegistry>,
    generation: GenerationOptions,
    max_iterations: Option<usize>,
}

impl AgentFactory {
    fn build<O: StructuredOutput>(&self, role: AgentRole, prompt: String) -> Result<Agent<O>> {
        let mut builder = AgentBuilder::<O>::new()
            .name(format!("pumppie-{}", role.name()))
            .provider(Arc::clone(&self.provider))
            .tools(Arc::clone(&self.tools))
            .generation(self.generation.clone())
            .system_prompt(prompt);

        if let Some(max) = self.max_iterations {
            builder = builder.max_iterations(max);
        }

        Ok(builder.build()?)
    }
}

#[allow(clippy::cast_possible_truncation)]
fn generation_options(llm: LlmModel, llm_config: &Map<String, Value>) -> GenerationOptions {
    let mut generation = GenerationOptions {
        model: llm.as_str().to_string(),
        ..GenerationOptions::default()
    };

    if let Some(temperature) = llm_config.get("temperature").and_then(Value::as_f64) {
        generation.temperature = temperature as f32;
    }
    if let Some(max_tokens) = llm_config
        .get("max_tokens")
        .and_then(Value::as_u64)
        .and_then(|n| u32::try_from(n).ok())
    {
        generation.max_tokens = max_tokens;
    }

    generation
}

#[cfg(test)]
mod tests {
    use super::*;
    use agent_core::AgentError;
    use agent_core::message::Message;
    use agent_core::provider::Completion;
    use async_trait::async_trait;
    use std::sync::Mutex as StdMutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Replies in order, then fails like an unreachable API
    struct ScriptedProvider {
        replies: StdMutex<Vec<String>>,
        calls: AtomicUsize,
    }

    impl ScriptedProvider {
        fn new(replies: &[&str]) -> Arc<Self> {
            Arc::new(Self {
                replies: StdMutex::new(replies.iter().rev().map(|s| (*s).to_string()).collect()),
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl LlmProvider for ScriptedProvider {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn health_check(&self) -> agent_core::Result<bool> {
            Ok(true)
        }

        async fn complete(
            &self,
            _messages: &[Message],
            options: &GenerationOptions,
        ) -> agent_core::Result<Completion> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let reply = self
                .replies
                .lock()
                .unwrap()
                .pop()
                .ok_or_else(|| AgentError::Provider("offline".into()))?;
            Ok(Completion::text(reply, options.model.clone()))
        }
    }

    async fn live_agent(provider: &Arc<ScriptedProvider>) -> PumpPieAgent {
        PumpPieAgent::with_provider(
            7,
            LlmModel::Gpt41Mini,
            Arc::clone(provider) as Arc<dyn LlmProvider>,
            None,
            McpMode::Test,
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_live_message_uses_conversation_agent() {
        let provider = ScriptedProvider::new(&[r#"{"response": "Start with a weekly BTC plan."}"#]);
        let agent = live_agent(&provider).await;

        assert_eq!(agent.process_message("How do I start?").await, "Start with a weekly BTC plan.");
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_live_message_failure_becomes_apology() {
        let provider = ScriptedProvider::new(&[]);
        let agent = live_agent(&provider).await;

        let reply = agent.process_message("Hello").await;
        assert_eq!(reply, "Sorry, I encountered an error: Provider error: offline");
    }

    #[tokio::test]
    async fn test_live_dca_rejects_amount_below_minimum() {
        let provider = ScriptedProvider::new(&[]);
        let agent = live_agent(&provider).await;

        for amount in [dec!(0.5), dec!(10000.01)] {
            let err = agent
                .create_dca_strategy("BTC", amount, DcaInterval::Weekly, 12)
                .await
                .unwrap_err();
            assert!(matches!(err, AdvisorError::Validation(_)), "{err}");
        }
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_live_dca_returns_agent_strategy() {
        let reply = serde_json::json!({
            "strategy_id": "dca_7_ETH",
            "asset": "ETH",
            "amount_per_interval": "100",
            "interval": "weekly",
            "duration_months": 12,
            "current_price": "2580.75",
            "risk_assessment": "high",
            "recommendation": "hold",
            "total_investment": "4800",
            "expected_purchases": 48,
            "entry_conditions": ["RSI below 70"],
            "exit_conditions": ["Target allocation reached"],
            "explanation": "Weekly purchases smooth out ETH volatility.",
        })
        .to_string();
        let provider = ScriptedProvider::new(&[&reply]);
        let agent = live_agent(&provider).await;

        let strategy = agent
            .create_dca_strategy("ETH", dec!(100), DcaInterval::Weekly, 12)
            .await
            .unwrap();
        assert_eq!(strategy.asset, "ETH");
        assert_eq!(strategy.total_investment, dec!(4800));
        assert_eq!(strategy.risk_assessment, RiskLevel::High);
        assert_eq!(strategy.recommendation, InvestmentRecommendation::Hold);
        assert!(strategy.warnings.is_empty());
    }

    #[tokio::test]
    async fn test_live_dca_propagates_provider_failure() {
        let provider = ScriptedProvider::new(&[]);
        let agent = live_agent(&provider).await;

        let err = agent
            .create_dca_strategy("BTC", dec!(50), DcaInterval::Monthly, 6)
            .await
            .unwrap_err();
        assert!(matches!(err, AdvisorError::Agent(AgentError::Provider(_))), "{err}");
    }

    #[tokio::test]
    async fn test_live_portfolio_and_market_errors_propagate() {
        let provider = ScriptedProvider::new(&[]);
        let agent = live_agent(&provider).await;

        assert!(matches!(
            agent.get_portfolio_status().await,
            Err(AdvisorError::Agent(AgentError::Provider(_)))
        ));
        assert!(matches!(
            agent.get_market_analysis("BTC").await,
            Err(AdvisorError::Agent(AgentError::Provider(_)))
        ));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_process_message_in_test_mode() {
        let agent = PumpPieAgent::test(1).await.unwrap();
        let reply = agent.process_message("Hello, how are you?").await;
        assert_eq!(reply, "Test response to: Hello, how are you?");
    }

    #[tokio::test]
    async fn test_dca_strategy_in_test_mode() {
        let agent = PumpPieAgent::test(42).await.unwrap();

        for (amount, months) in [(dec!(100), 12), (dec!(25.50), 3), (dec!(0), 1)] {
            let strategy = agent
                .create_dca_strategy("BTC", amount, DcaInterval::Weekly, months)
                .await
                .unwrap();

            assert_eq!(strategy.strategy_id, "dca_42_BTC");
            assert_eq!(strategy.expected_purchases, 4 * months);
            assert_eq!(strategy.total_investment, amount * Decimal::from(4 * months));
            assert_eq!(strategy.current_price, dec!(50000.00));
            assert_eq!(strategy.risk_assessment, RiskLevel::Moderate);
            assert_eq!(strategy.recommendation, InvestmentRecommendation::Buy);
            assert!(strategy.validate().is_ok());
        }
    }

    #[tokio::test]
    async fn test_portfolio_and_market_mocks_validate() {
        let agent = PumpPieAgent::test(3).await.unwrap();

        let portfolio = agent.get_portfolio_status().await.unwrap();
        assert_eq!(portfolio.total_pnl_percentage, dec!(17.65));
        assert!(portfolio.validate().is_ok());

        let market = agent.get_market_analysis("ETH").await.unwrap();
        assert_eq!(market.detailed_analysis, "Test analysis for ETH");
        assert_eq!(market.optimal_entry_range["min"], dec!(48000));
        assert!(market.validate().is_ok());
    }

    #[tokio::test]
    async fn test_health_check() {
        let mut config = Map::new();
        config.insert("temperature".into(), Value::from(0.2));
        let agent = PumpPieAgent::new(9, LlmModel::Test, Some(config), McpMode::Test)
            .await
            .unwrap();

        let health = agent.health_check();
        assert_eq!(health.status, "healthy");
        assert!(health.agents_initialized.all());
        assert_eq!(health.mcp_servers.count, 0);
        assert_eq!(health.config["temperature"], 0.2);

        let json = serde_json::to_value(&health).unwrap();
        assert_eq!(json["model"], "test");
        assert_eq!(json["mcp_mode"], "test");
    }

    #[tokio::test]
    async fn test_setup_info_without_servers() {
        let agent = PumpPieAgent::test(5).await.unwrap();
        let setup = agent.setup_info();
        assert_eq!(setup.mcp_mode, McpMode::Test);
        assert_eq!(setup.active_servers, 0);
        assert!(setup.server_list.is_empty());
        assert!(setup.server_capabilities.custom.contains_key("crypto_market_analysis"));
        agent.close().await;
    }

    #[test]
    fn test_generation_overrides() {
        let mut config = Map::new();
        config.insert("temperature".into(), Value::from(0.1));
        config.insert("max_tokens".into(), Value::from(512));

        let generation = generation_options(LlmModel::Gpt41Mini, &config);
        assert_eq!(generation.model, "gpt-4.1-mini");
        assert!((generation.temperature - 0.1).abs() < f32::EPSILON);
        assert_eq!(generation.max_tokens, 512);
    }
}
