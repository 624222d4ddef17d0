//! A solver child process speaking SMT-LIB over pipes.
//!
//! A separate thread writes data to the solver over a pipe, and another
//! reads responses. (Rust's documentation says you need a separate thread;
//! otherwise, it lets the pipes deadlock.) Requests are terminated with an
//! echo marker so the reader knows when the solver is done.

use std::io::{BufRead, BufReader, Write};
use std::process::{Child, ChildStdin, ChildStdout, Stdio};
use std::sync::mpsc::{channel, Receiver, Sender};

const DONE: &str = "<<DONE>>";

pub(crate) struct SmtProcess {
    requests: Sender<Vec<u8>>,
    responses_buf_recv:
        Option<(BufReader<ChildStdout>, Receiver<(BufReader<ChildStdout>, Vec<String>)>)>,
    recv_requests: Sender<BufReader<ChildStdout>>,
    child: Child,
}

fn writer_thread(requests: Receiver<Vec<u8>>, mut stdin: ChildStdin) {
    while let Ok(req) = requests.recv() {
        stdin
            .write_all(&req)
            .and_then(|_| writeln!(&mut stdin))
            .and_then(|_| writeln!(&mut stdin, "(echo \"{}\")", DONE))
            .and_then(|_| stdin.flush())
            // The solver process could die unexpectedly.  In that case, we die too:
            .expect("IO error: failure when sending data to the solver process across pipe");
    }
    // Exit when the other side closes the channel
}

fn reader_thread(
    recv_requests: Receiver<BufReader<ChildStdout>>,
    responses: Sender<(BufReader<ChildStdout>, Vec<String>)>,
) {
    while let Ok(mut stdout) = recv_requests.recv() {
        let mut lines = Vec::new();
        loop {
            let mut line = String::new();
            stdout
                .read_line(&mut line)
                .expect("IO error: failure when receiving data from the solver process");
            line = line.replace('\n', "").replace('\r', "");
            if line == DONE {
                responses.send((stdout, lines)).expect("internal error: solver reader thread");
                break;
            }
            lines.push(line);
        }
    }
}

impl SmtProcess {
    pub(crate) fn launch(executable: &str, args: &[&str]) -> std::io::Result<SmtProcess> {
        let mut child = std::process::Command::new(executable)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .spawn()?;
        let stdout = BufReader::new(child.stdout.take().expect("take stdout"));
        let stdin = child.stdin.take().expect("take stdin");
        let (requests_sender, requests_receiver) = channel();
        let (responses_sender, responses_receiver) = channel();
        let (recv_requests_sender, recv_requests_receiver) = channel();
        std::thread::spawn(move || writer_thread(requests_receiver, stdin));
        std::thread::spawn(move || reader_thread(recv_requests_receiver, responses_sender));
        Ok(SmtProcess {
            requests: requests_sender,
            responses_buf_recv: Some((stdout, responses_receiver)),
            recv_requests: recv_requests_sender,
            child,
        })
    }

    /// Send commands to the solver, wait for acknowledgement, and return the
    /// response lines.
    pub(crate) fn send_commands(&mut self, commands: Vec<u8>) -> Vec<String> {
        self.requests.send(commands).expect("internal error: failed to send to writer thread");
        let (stdout, receiver) =
            self.responses_buf_recv.take().expect("internal error: response buffer in use");
        self.recv_requests
            .send(stdout)
            .expect("internal error: failed to send to reader thread");
        let (stdout, result) =
            receiver.recv().expect("internal error: solver reader thread failure");
        self.responses_buf_recv = Some((stdout, receiver));
        result
    }
}

impl Drop for SmtProcess {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}
