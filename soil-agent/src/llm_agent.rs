use crate::memory_extractor::MemoryExtractor;
use futures::StreamExt;
use serde_json::{Value, json};
use soil_core::{
    CallContext, Content, Event, Llm, LlmRequest, Part, ROLE_FUNCTION, ROLE_MODEL, ReadonlyContext,
    Result, SoilError, StaticContext, Tool, ToolContext, Toolset, UsageMetadata,
};
use soil_memory::{MemoryScope, MemoryService, UserMemory};
use soil_telemetry::{Instrument, agent_run_span, model_call_span, tool_execute_span};
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

pub const DEFAULT_MAX_ITERATIONS: usize = 10;

/// What a run does when a tool call fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ToolFailurePolicy {
    /// Abort the run and return the tool's error unchanged.
    #[default]
    Propagate,
    /// Report `{"error": ...}` to the model and let it answer without the result.
    Degrade,
}

impl FromStr for ToolFailurePolicy {
    type Err = SoilError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "propagate" => Ok(Self::Propagate),
            "degrade" => Ok(Self::Degrade),
            other => Err(SoilError::Config(format!(
                "unknown tool failure policy '{other}' (expected 'propagate' or 'degrade')"
            ))),
        }
    }
}

/// Outcome of one [`LlmAgent::run`].
#[derive(Debug, Clone)]
pub struct AgentResponse {
    pub text: String,
    /// Model turns and tool results, in order. The last event is the answer.
    pub events: Vec<Event>,
    pub user_id: String,
    pub session_id: String,
    pub usage: Option<UsageMetadata>,
}

pub struct LlmAgent {
    name: String,
    description: String,
    model: Arc<dyn Llm>,
    instruction: Option<String>,
    tools: Vec<Arc<dyn Tool>>,
    toolsets: Vec<Arc<dyn Toolset>>,
    memory: Option<Arc<dyn MemoryService>>,
    enable_user_memories: bool,
    max_iterations: usize,
    tool_failure_policy: ToolFailurePolicy,
    debug: bool,
    extractor: MemoryExtractor,
}

impl std::fmt::Debug for LlmAgent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmAgent")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("model", &self.model.name())
            .field("instruction", &self.instruction)
            .field("tools_count", &self.tools.len())
            .field("toolsets_count", &self.toolsets.len())
            .field("has_memory", &self.memory.is_some())
            .field("enable_user_memories", &self.enable_user_memories)
            .field("max_iterations", &self.max_iterations)
            .field("tool_failure_policy", &self.tool_failure_policy)
            .finish()
    }
}

pub struct LlmAgentBuilder {
    name: String,
    description: Option<String>,
    model: Option<Arc<dyn Llm>>,
    instruction: Option<String>,
    tools: Vec<Arc<dyn Tool>>,
    toolsets: Vec<Arc<dyn Toolset>>,
    memory: Option<Arc<dyn MemoryService>>,
    enable_user_memories: bool,
    max_iterations: usize,
    tool_failure_policy: ToolFailurePolicy,
    debug: bool,
}

impl LlmAgentBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            model: None,
            instruction: None,
            tools: Vec::new(),
            toolsets: Vec::new(),
            memory: None,
            enable_user_memories: false,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            tool_failure_policy: ToolFailurePolicy::default(),
            debug: false,
        }
    }

    pub fn description(mut self, desc: impl Into<String>) -> Self {
        self.description = Some(desc.into());
        self
    }

    pub fn model(mut self, model: Arc<dyn Llm>) -> Self {
        self.model = Some(model);
        self
    }

    pub fn instruction(mut self, instruction: impl Into<String>) -> Self {
        self.instruction = Some(instruction.into());
        self
    }

    pub fn tool(mut self, tool: Arc<dyn Tool>) -> Self {
        self.tools.push(tool);
        self
    }

    pub fn toolset(mut self, toolset: Arc<dyn Toolset>) -> Self {
        self.toolsets.push(toolset);
        self
    }

    /// Store for session history and user memories.
    pub fn memory_service(mut self, memory: Arc<dyn MemoryService>) -> Self {
        self.memory = Some(memory);
        self
    }

    /// Inject known facts about the user and extract new ones after each run.
    pub fn enable_user_memories(mut self, enable: bool) -> Self {
        self.enable_user_memories = enable;
        self
    }

    pub fn max_iterations(mut self, max: usize) -> Self {
        self.max_iterations = max;
        self
    }

    pub fn tool_failure_policy(mut self, policy: ToolFailurePolicy) -> Self {
        self.tool_failure_policy = policy;
        self
    }

    /// Log every model request and reply.
    pub fn debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn build(self) -> Result<LlmAgent> {
        let model = self.model.ok_or_else(|| SoilError::Agent("Model is required".to_string()))?;

        if self.enable_user_memories && self.memory.is_none() {
            return Err(SoilError::Agent("User memories require a memory service".to_string()));
        }
        if self.max_iterations == 0 {
            return Err(SoilError::Agent("max_iterations must be at least 1".to_string()));
        }

        Ok(LlmAgent {
            name: self.name,
            description: self.description.unwrap_or_default(),
            extractor: MemoryExtractor::new(model.clone()),
            model,
            instruction: self.instruction,
            tools: self.tools,
            toolsets: self.toolsets,
            memory: self.memory,
            enable_user_memories: self.enable_user_memories,
            max_iterations: self.max_iterations,
            tool_failure_policy: self.tool_failure_policy,
            debug: self.debug,
        })
    }
}

impl LlmAgent {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn tool_failure_policy(&self) -> ToolFailurePolicy {
        self.tool_failure_policy
    }

    /// Answer `message` for the given user and session.
    ///
    /// `user_id` and `session_id` are used verbatim as the memory scope.
    pub async fn run(
        &self,
        user_id: &str,
        session_id: &str,
        message: &str,
    ) -> Result<AgentResponse> {
        let invocation_id = uuid::Uuid::new_v4().to_string();
        let span = agent_run_span(&self.name, &invocation_id, user_id, session_id);
        self.run_invocation(invocation_id, MemoryScope::new(user_id, session_id), message)
            .instrument(span)
            .await
    }

    async fn run_invocation(
        &self,
        invocation_id: String,
        scope: MemoryScope,
        message: &str,
    ) -> Result<AgentResponse> {
        info!("Starting agent execution");

        let user_content = Content::user(message);
        let ctx = Arc::new(StaticContext::new(
            &invocation_id,
            &self.name,
            &scope.user_id,
            &scope.session_id,
            user_content.clone(),
        ));
        let tools = self.resolve_tools(ctx.clone()).await?;
        let tool_declarations: HashMap<String, Value> =
            tools.iter().map(|(name, tool)| (name.clone(), tool.declaration())).collect();

        let memories = match (&self.memory, self.enable_user_memories) {
            (Some(memory), true) => memory.user_memories(&scope.user_id).await?,
            _ => Vec::new(),
        };

        let mut conversation = Vec::new();
        if let Some(system) = self.system_content(&memories) {
            conversation.push(system);
        }
        if let Some(memory) = &self.memory {
            conversation.extend(memory.session_history(&scope).await?);
        }
        conversation.push(user_content.clone());

        let mut events = Vec::new();
        let mut usage: Option<UsageMetadata> = None;
        let mut iteration = 0;

        let answer = loop {
            iteration += 1;
            if iteration > self.max_iterations {
                return Err(SoilError::Agent(format!(
                    "Max iterations ({}) exceeded",
                    self.max_iterations
                )));
            }

            let request = LlmRequest {
                model: self.model.name().to_string(),
                contents: conversation.clone(),
                config: None,
                tools: tool_declarations.clone(),
            };
            if self.debug {
                debug!(iteration, contents = ?request.contents, "model request");
            }

            let (content, turn_usage) =
                self.call_model(request).instrument(model_call_span(self.model.name())).await?;
            if let Some(turn_usage) = &turn_usage {
                usage.get_or_insert_with(UsageMetadata::default).accumulate(turn_usage);
            }
            if self.debug {
                debug!(iteration, content = ?content, "model reply");
            }

            events.push(
                Event::new(&invocation_id)
                    .with_author(&self.name)
                    .with_content(content.clone())
                    .with_usage(turn_usage),
            );

            if !content.has_function_calls() {
                break content;
            }

            conversation.push(content.clone());
            for response in self.execute_function_calls(&content, &tools, &ctx).await? {
                events.push(
                    Event::new(&invocation_id).with_author(&self.name).with_content(response.clone()),
                );
                conversation.push(response);
            }
        };

        if let Some(memory) = &self.memory {
            memory.append_to_session(&scope, vec![user_content, answer.clone()]).await?;
            if self.enable_user_memories {
                self.update_user_memories(memory.as_ref(), &scope, message, &memories).await?;
            }
        }

        info!(iterations = iteration, "Agent execution complete");
        Ok(AgentResponse {
            text: answer.text(),
            events,
            user_id: scope.user_id,
            session_id: scope.session_id,
            usage,
        })
    }

    /// Tools and toolset members keyed by name. Duplicate names are an error.
    async fn resolve_tools(
        &self,
        ctx: Arc<StaticContext>,
    ) -> Result<HashMap<String, Arc<dyn Tool>>> {
        let mut resolved: Vec<Arc<dyn Tool>> = self.tools.clone();
        for toolset in &self.toolsets {
            resolved.extend(toolset.tools(ctx.clone() as Arc<dyn ReadonlyContext>).await?);
        }

        let mut by_name = HashMap::with_capacity(resolved.len());
        for tool in resolved {
            let name = tool.name().to_string();
            if by_name.insert(name.clone(), tool).is_some() {
                return Err(SoilError::Agent(format!("Duplicate tool name '{name}'")));
            }
        }
        Ok(by_name)
    }

    fn system_content(&self, memories: &[UserMemory]) -> Option<Content> {
        let mut text = self.instruction.clone().unwrap_or_default();
        if !memories.is_empty() {
            if !text.is_empty() {
                text.push_str("\n\n");
            }
            text.push_str(
                "You have access to memories from previous interactions with the user:\n\n\
                 <memories_from_previous_interactions>\n",
            );
            for memory in memories {
                text.push_str("- ");
                text.push_str(&memory.memory);
                text.push('\n');
            }
            text.push_str(
                "</memories_from_previous_interactions>\n\n\
                 Prefer information from the current conversation over these memories.",
            );
        }
        (!text.is_empty()).then(|| Content::system(text))
    }

    /// Stream one model turn and merge its chunks into a single content.
    async fn call_model(&self, request: LlmRequest) -> Result<(Content, Option<UsageMetadata>)> {
        let mut stream = self.model.generate_content(request, true).await?;
        let mut accumulated = Content::new(ROLE_MODEL);
        let mut usage = None;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            if let Some(code) = chunk.error_code {
                return Err(SoilError::Model(format!(
                    "{code}: {}",
                    chunk.error_message.unwrap_or_default()
                )));
            }
            if chunk.usage_metadata.is_some() {
                usage = chunk.usage_metadata;
            }
            if let Some(content) = chunk.content {
                accumulated.parts.extend(content.parts);
            }
            if chunk.turn_complete {
                break;
            }
        }

        coalesce_text_parts(&mut accumulated);
        Ok((accumulated, usage))
    }

    /// Run each requested call in order, one function response content per call.
    async fn execute_function_calls(
        &self,
        content: &Content,
        tools: &HashMap<String, Arc<dyn Tool>>,
        invocation: &Arc<StaticContext>,
    ) -> Result<Vec<Content>> {
        let mut responses = Vec::new();

        for part in &content.parts {
            let Part::FunctionCall { name, args, id } = part else { continue };

            let result = match tools.get(name) {
                None => {
                    warn!(tool.name = %name, "model requested an unknown tool");
                    json!({ "error": format!("Tool {name} not found") })
                }
                Some(tool) => {
                    let call_id = id.clone().unwrap_or_else(|| format!("{}_{name}", invocation.invocation_id));
                    let tool_ctx: Arc<dyn ToolContext> =
                        Arc::new(CallContext::new(invocation.clone(), call_id));

                    match tool.execute(tool_ctx, args.clone()).instrument(tool_execute_span(name)).await {
                        Ok(value) => value,
                        Err(e) => match self.tool_failure_policy {
                            ToolFailurePolicy::Propagate => {
                                error!(tool.name = %name, error = %e, "tool failed, aborting run");
                                return Err(e);
                            }
                            ToolFailurePolicy::Degrade => {
                                warn!(tool.name = %name, error = %e, "tool failed, reporting to model");
                                json!({ "error": e.to_string() })
                            }
                        },
                    }
                }
            };

            responses.push(
                Content::new(ROLE_FUNCTION)
                    .with_part(Part::function_response(name.clone(), result, id.clone())),
            );
        }

        Ok(responses)
    }

    async fn update_user_memories(
        &self,
        memory: &dyn MemoryService,
        scope: &MemoryScope,
        message: &str,
        known: &[UserMemory],
    ) -> Result<()> {
        let facts = match self.extractor.extract(message, known).await {
            Ok(facts) => facts,
            Err(e) => {
                warn!(error = %e, "memory extraction failed, skipping");
                return Ok(());
            }
        };
        if facts.is_empty() {
            return Ok(());
        }

        let added = memory
            .add_user_memories(scope, facts, message)
            .instrument(soil_telemetry::memory_span("add", &scope.user_id))
            .await?;
        debug!(count = added.len(), "user memories updated");
        Ok(())
    }
}

/// Join adjacent text parts left over from streaming.
fn coalesce_text_parts(content: &mut Content) {
    let parts = std::mem::take(&mut content.parts);
    for part in parts {
        if let (Some(Part::Text { text: last }), Part::Text { text }) =
            (content.parts.last_mut(), &part)
        {
            last.push_str(text);
            continue;
        }
        content.parts.push(part);
    }
}
