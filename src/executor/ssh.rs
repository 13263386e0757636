//! SSH 远程执行后端
//!
//! Init 时建立一条经认证的会话（密码或私钥），之后每次 run 在该会话上
//! 开 channel 执行，不按命令重连。libssh2 是阻塞调用，统一经
//! spawn_blocking 进入阻塞线程池，会话由互斥锁独占。

use std::io::Read;
use std::net::TcpStream;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use ssh2::Session;

use crate::config::SshSection;
use crate::core::AgentError;
use crate::executor::{ExecutionBackend, ExecutionResult};

/// SSH 后端：单会话长连接，close 幂等
pub struct SshBackend {
    session: Arc<Mutex<Option<Session>>>,
    host: String,
}

impl SshBackend {
    /// 建立并认证 SSH 会话
    ///
    /// 任何失败都归入 ConnectFailed（可恢复错误），由上层决定改配置、
    /// 降级本地还是退出。
    pub async fn connect(cfg: &SshSection) -> Result<Self, AgentError> {
        let cfg = cfg.clone();
        let host = cfg.host.clone();

        let session = tokio::task::spawn_blocking(move || -> Result<Session, AgentError> {
            let addr = if cfg.host.contains(':') {
                cfg.host.clone()
            } else {
                format!("{}:22", cfg.host)
            };

            let tcp = TcpStream::connect(&addr)
                .map_err(|e| AgentError::ConnectFailed(format!("tcp {}: {}", addr, e)))?;

            let mut sess = Session::new()
                .map_err(|e| AgentError::ConnectFailed(format!("session init: {}", e)))?;
            sess.set_tcp_stream(tcp);
            sess.handshake()
                .map_err(|e| AgentError::ConnectFailed(format!("handshake: {}", e)))?;

            if !cfg.key_path.trim().is_empty() {
                sess.userauth_pubkey_file(&cfg.user, None, Path::new(&cfg.key_path), None)
                    .map_err(|e| AgentError::ConnectFailed(format!("pubkey auth: {}", e)))?;
            } else {
                sess.userauth_password(&cfg.user, &cfg.password)
                    .map_err(|e| AgentError::ConnectFailed(format!("password auth: {}", e)))?;
            }

            if !sess.authenticated() {
                return Err(AgentError::ConnectFailed("authentication rejected".into()));
            }
            Ok(sess)
        })
        .await
        .map_err(|e| AgentError::ConnectFailed(format!("connect task: {}", e)))??;

        tracing::info!(host = %host, "ssh session established");

        Ok(Self {
            session: Arc::new(Mutex::new(Some(session))),
            host,
        })
    }
}

fn lock_session(m: &Mutex<Option<Session>>) -> MutexGuard<'_, Option<Session>> {
    match m.lock() {
        Ok(g) => g,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// 在已认证会话上执行一条命令：channel -> exec -> 读 stdout/stderr -> 取退出码
fn exec_on(sess: &Session, command: &str) -> ExecutionResult {
    let fail = |msg: String| ExecutionResult {
        output: String::new(),
        error: Some(msg),
    };

    let mut channel = match sess.channel_session() {
        Ok(c) => c,
        Err(e) => return fail(format!("open channel: {}", e)),
    };
    if let Err(e) = channel.exec(command) {
        return fail(format!("exec: {}", e));
    }

    let mut output = String::new();
    let _ = channel.read_to_string(&mut output);
    let mut stderr = String::new();
    let _ = channel.stderr().read_to_string(&mut stderr);
    if !stderr.trim().is_empty() {
        if !output.is_empty() && !output.ends_with('\n') {
            output.push('\n');
        }
        output.push_str(stderr.trim_end());
    }

    let _ = channel.wait_close();
    let error = match channel.exit_status() {
        Ok(0) => None,
        Ok(code) => Some(format!("exit status: {}", code)),
        Err(e) => Some(format!("exit status unavailable: {}", e)),
    };

    ExecutionResult { output, error }
}

#[async_trait]
impl ExecutionBackend for SshBackend {
    async fn run(&self, command: &str) -> ExecutionResult {
        tracing::info!(host = %self.host, command, "ssh exec");

        let session = Arc::clone(&self.session);
        let command = command.to_string();
        let result = tokio::task::spawn_blocking(move || {
            let guard = lock_session(&session);
            match guard.as_ref() {
                Some(sess) => exec_on(sess, &command),
                None => ExecutionResult {
                    output: String::new(),
                    error: Some("ssh session already closed".into()),
                },
            }
        })
        .await;

        match result {
            Ok(r) => r,
            Err(e) => ExecutionResult {
                output: String::new(),
                error: Some(format!("exec task: {}", e)),
            },
        }
    }

    fn is_remote(&self) -> bool {
        true
    }

    async fn close(&self) {
        let session = Arc::clone(&self.session);
        let host = self.host.clone();
        let _ = tokio::task::spawn_blocking(move || {
            let mut guard = lock_session(&session);
            if let Some(sess) = guard.take() {
                let _ = sess.disconnect(None, "session finished", None);
                tracing::info!(host = %host, "ssh session closed");
            }
        })
        .await;
    }
}
