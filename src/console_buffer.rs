use crate::consts::CONSOLE_TX_BUFFER_SIZE;
use core::sync::atomic::{AtomicBool, AtomicU8, AtomicUsize, Ordering};

/// The serial port the console is attached to. Unlike the dmx uart it is never timing
/// critical, so every operation is non-blocking and infallible.
pub trait ConsoleUart {
    /// Returns the next received byte if there is one.
    fn read_byte(&mut self) -> Option<u8>;

    /// Returns true if the transmit fifo can take another byte.
    fn is_transmit_fifo_empty(&mut self) -> bool;

    /// Puts a byte into the transmit fifo.
    fn write_transmit_fifo(&mut self, byte: u8);
}

/// Circular transmit buffer between the main loop (single producer) and the transmit
/// interrupt (consumer).
///
/// One slot always stays free to tell a full buffer from an empty one, so
/// `N - 1` bytes can be buffered. `head` is only written by [ConsoleBuffer::enqueue], `tail`
/// only by [ConsoleBuffer::drain_one], which claims each byte with a compare and swap since
/// [ConsoleBuffer::kick] drains from the main loop too. Both recompute `full` from head and
/// tail after every change.
///
/// ```rust
/// use dmx_poll::console_buffer::ConsoleBuffer;
///
/// static CONSOLE: ConsoleBuffer = ConsoleBuffer::new();
///
/// assert_eq!(CONSOLE.enqueue(b"Ready."), 6);
/// assert_eq!(CONSOLE.drain_one(), Some(b'R'));
/// ```
pub struct ConsoleBuffer<const N: usize = CONSOLE_TX_BUFFER_SIZE> {
    buffer: [AtomicU8; N],
    head: AtomicUsize,
    tail: AtomicUsize,
    full: AtomicBool,
    /// Set while a byte is moved from the buffer into the fifo.
    transmitting: AtomicBool,
}

impl<const N: usize> Default for ConsoleBuffer<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> ConsoleBuffer<N> {
    pub const fn new() -> Self {
        Self {
            buffer: [const { AtomicU8::new(0) }; N],
            head: AtomicUsize::new(0),
            tail: AtomicUsize::new(0),
            full: AtomicBool::new(false),
            transmitting: AtomicBool::new(false),
        }
    }

    /// Amount of bytes the buffer can hold.
    pub const fn capacity(&self) -> usize {
        N - 1
    }

    /// Appends as many bytes as fit. Bytes that don't fit are dropped, the protocol loop never
    /// waits for the console.
    ///
    /// Returns the amount of bytes accepted.
    pub fn enqueue(&self, bytes: &[u8]) -> usize {
        let mut accepted = 0;

        for byte in bytes {
            if self.recompute_full() {
                break;
            }

            let head = self.head.load(Ordering::Relaxed);
            self.buffer[head].store(*byte, Ordering::Relaxed);
            self.head.store((head + 1) % N, Ordering::Release);
            accepted += 1;
        }
        self.recompute_full();

        if accepted < bytes.len() {
            log::trace!("console buffer full, dropped {} bytes", bytes.len() - accepted);
        }

        accepted
    }

    /// Takes the oldest byte out of the buffer. The byte is claimed by advancing `tail`, so
    /// two callers never get the same byte.
    pub fn drain_one(&self) -> Option<u8> {
        let mut tail = self.tail.load(Ordering::Acquire);

        loop {
            if tail == self.head.load(Ordering::Acquire) {
                self.recompute_full();
                return None;
            }

            // the producer doesn't touch this slot before tail moved past it
            let byte = self.buffer[tail].load(Ordering::Relaxed);
            match self.tail.compare_exchange(
                tail,
                (tail + 1) % N,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => {
                    self.recompute_full();
                    return Some(byte);
                },
                Err(current) => tail = current,
            }
        }
    }

    /// True if the next write would make head collide with tail.
    pub fn is_full(&self) -> bool {
        self.full.load(Ordering::Acquire)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn len(&self) -> usize {
        let head = self.head.load(Ordering::Acquire);
        let tail = self.tail.load(Ordering::Acquire);

        (head + N - tail) % N
    }

    /// Body of the transmit interrupt: moves one byte into the fifo.
    pub fn service_transmit_interrupt(&self, uart: &mut impl ConsoleUart) {
        self.transmit_one(uart);
    }

    /// The transmit interrupt only fires when the fifo runs empty. If it already is empty,
    /// nobody would pick up freshly enqueued bytes, so the first one gets written directly.
    pub fn kick(&self, uart: &mut impl ConsoleUart) {
        if uart.is_transmit_fifo_empty() {
            self.transmit_one(uart);
        }
    }

    /// Takes a byte and writes it to the fifo. If the transmit interrupt preempts [Self::kick]
    /// in between it leaves the buffer alone, so bytes reach the fifo in order. The byte
    /// written by `kick` raises the next interrupt.
    fn transmit_one(&self, uart: &mut impl ConsoleUart) {
        if self.transmitting.swap(true, Ordering::Acquire) {
            return;
        }

        if let Some(byte) = self.drain_one() {
            uart.write_transmit_fifo(byte);
        }
        self.transmitting.store(false, Ordering::Release);
    }

    fn recompute_full(&self) -> bool {
        let head = self.head.load(Ordering::Acquire);
        let tail = self.tail.load(Ordering::Acquire);
        let full = (head + 1) % N == tail;
        self.full.store(full, Ordering::Release);

        full
    }
}
